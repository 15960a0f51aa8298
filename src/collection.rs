//! A named collection: an index plus the document names of its rows.
//!
//! Row `i` of the index and entry `i` of `doc_names` always describe the
//! same document. Every mutation goes through this type so the two can only
//! change together.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::index::FlatL2Index;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    index: FlatL2Index,
    doc_names: Vec<String>,
}

impl Collection {
    pub fn new(dimension: usize) -> Result<Self> {
        Ok(Collection { index: FlatL2Index::new(dimension)?, doc_names: Vec::new() })
    }

    /// Checks a deserialized collection: a valid index with one row per name.
    pub fn validate(&self) -> Result<()> {
        self.index.validate()?;
        if self.index.len() != self.doc_names.len() {
            return Err(StoreError::corrupt(format!(
                "{} index rows for {} document names",
                self.index.len(),
                self.doc_names.len()
            )));
        }
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.doc_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_names.is_empty()
    }

    /// Position of `doc_name`, found by linear scan.
    pub fn position(&self, doc_name: &str) -> Option<usize> {
        self.doc_names.iter().position(|name| name == doc_name)
    }

    pub fn contains(&self, doc_name: &str) -> bool {
        self.position(doc_name).is_some()
    }

    /// Document names in position order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.doc_names.iter().map(String::as_str)
    }

    /// Stored embedding of the document at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.index.get(position)
    }

    /// Appends a document. The index is written first so a rejected vector
    /// leaves the name list untouched.
    pub fn push(&mut self, doc_name: String, vector: &[f32]) -> Result<usize> {
        let position = self.index.add(vector)?;
        self.doc_names.push(doc_name);
        Ok(position)
    }

    /// Swaps the embedding at `position` in place.
    pub fn replace(&mut self, position: usize, vector: &[f32]) -> Result<()> {
        self.index.replace(position, vector)
    }

    /// Removes the document at `position` and returns its name.
    pub fn remove(&mut self, position: usize) -> Result<String> {
        self.index.remove(position)?;
        Ok(self.doc_names.remove(position))
    }

    /// Nearest documents to `query`, closest first.
    pub fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<(&str, f32)>> {
        let hits = self.index.search(query, k)?;

        // Positions past the name list would mean the index and names diverged.
        Ok(hits
            .into_iter()
            .filter_map(|(position, dist)| {
                self.doc_names.get(position).map(|name| (name.as_str(), dist))
            })
            .collect())
    }
}
