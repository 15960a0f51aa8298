//! Global document registry: document name to text, unique across collections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    docs: HashMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn contains(&self, doc_name: &str) -> bool {
        self.docs.contains_key(doc_name)
    }

    pub fn get(&self, doc_name: &str) -> Option<&str> {
        self.docs.get(doc_name).map(String::as_str)
    }

    /// Records a new document. Names already present are rejected.
    pub fn insert(&mut self, doc_name: String, text: String) -> Result<()> {
        if self.docs.contains_key(&doc_name) {
            return Err(StoreError::document_exists(&doc_name));
        }
        self.docs.insert(doc_name, text);
        Ok(())
    }

    /// Replaces the text of an existing document.
    pub fn set(&mut self, doc_name: &str, text: String) -> Result<()> {
        match self.docs.get_mut(doc_name) {
            Some(slot) => {
                *slot = text;
                Ok(())
            }
            None => Err(StoreError::document_missing(doc_name)),
        }
    }

    pub fn remove(&mut self, doc_name: &str) -> Result<String> {
        self.docs
            .remove(doc_name)
            .ok_or_else(|| StoreError::document_missing(doc_name))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
