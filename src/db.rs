//! The store module
//! Collections, the global document registry, and whole-store persistence

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    collection::Collection,
    embed::{Embedder, EmbedderConfig},
    error::{Result, StoreError},
    registry::Registry,
};

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_name: String,
    pub text: String,
    /// Squared L2 distance from the query embedding.
    pub distance: f32,
}

/// Everything written to disk by [`VecStore::save`].
#[derive(Serialize, Deserialize, Default)]
struct StoreState {
    model: EmbedderConfig,
    collections: BTreeMap<String, Collection>,
    registry: Registry,
}

pub struct VecStore {
    state: StoreState,
    embedder: Arc<dyn Embedder>,
}

impl VecStore {
    /// Creates an empty store that embeds text with the model described by `model`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecdocs::{EmbedderConfig, VecStore};
    ///
    /// let store = VecStore::new(EmbedderConfig::default()).unwrap();
    /// assert_eq!(store.collection_count(), 0);
    /// ```
    pub fn new(model: EmbedderConfig) -> Result<VecStore> {
        let embedder = model.build()?;
        Ok(VecStore {
            state: StoreState { model, ..StoreState::default() },
            embedder,
        })
    }

    pub fn model(&self) -> &EmbedderConfig {
        &self.state.model
    }

    /// Creates an empty collection for vectors of length `dimension`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecdocs::{EmbedderConfig, VecStore};
    ///
    /// let mut store = VecStore::new(EmbedderConfig::default()).unwrap();
    /// store.create_collection("kb", 384).unwrap();
    ///
    /// // Names are unique
    /// assert!(store.create_collection("kb", 384).is_err());
    /// ```
    pub fn create_collection(&mut self, name: &str, dimension: usize) -> Result<()> {
        if self.state.collections.contains_key(name) {
            return Err(StoreError::collection_exists(name));
        }
        let collection = Collection::new(dimension)?;
        self.state.collections.insert(name.to_string(), collection);

        info!(collection = name, dimension, "created collection");
        Ok(())
    }

    /// Removes a collection together with the registry entries of its documents.
    pub fn drop_collection(&mut self, name: &str) -> Result<()> {
        let collection = self
            .state
            .collections
            .remove(name)
            .ok_or_else(|| StoreError::collection_missing(name))?;

        for doc_name in collection.names() {
            if self.state.registry.remove(doc_name).is_err() {
                warn!(collection = name, doc = doc_name, "document missing from registry");
            }
        }

        info!(collection = name, documents = collection.len(), "dropped collection");
        Ok(())
    }

    /// Names of all collections.
    pub fn collection_names(&self) -> Vec<String> {
        self.state.collections.keys().cloned().collect()
    }

    pub fn collection_count(&self) -> usize {
        self.state.collections.len()
    }

    /// Number of documents across every collection.
    pub fn document_count(&self) -> usize {
        self.state.registry.len()
    }

    /// Embeds `text` and stores it in `collection` under `doc_name`.
    ///
    /// Document names are unique across the whole store, not per collection.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecdocs::{EmbedderConfig, VecStore};
    ///
    /// let mut store = VecStore::new(EmbedderConfig::default()).unwrap();
    /// store.create_collection("a", 384).unwrap();
    /// store.create_collection("b", 384).unwrap();
    ///
    /// store.insert_document("a", "doc1", "some text").unwrap();
    /// assert!(store.insert_document("b", "doc1", "other text").is_err());
    /// ```
    pub fn insert_document(&mut self, collection: &str, doc_name: &str, text: &str) -> Result<()> {
        let coll = self
            .state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::collection_missing(collection))?;
        if self.state.registry.contains(doc_name) {
            return Err(StoreError::document_exists(doc_name));
        }

        let vector = self.embedder.embed(text)?;
        coll.push(doc_name.to_string(), &vector)?;
        self.state.registry.insert(doc_name.to_string(), text.to_string())?;

        debug!(collection, doc = doc_name, "inserted document");
        Ok(())
    }

    /// Re-embeds a document with `new_text`. The document keeps its position.
    pub fn update_document(&mut self, collection: &str, doc_name: &str, new_text: &str) -> Result<()> {
        let coll = self
            .state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::collection_missing(collection))?;
        let position = coll
            .position(doc_name)
            .ok_or_else(|| StoreError::document_missing(doc_name))?;

        let vector = self.embedder.embed(new_text)?;
        coll.replace(position, &vector)?;
        self.state.registry.set(doc_name, new_text.to_string())?;

        debug!(collection, doc = doc_name, position, "updated document");
        Ok(())
    }

    pub fn delete_document(&mut self, collection: &str, doc_name: &str) -> Result<()> {
        let coll = self
            .state
            .collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::collection_missing(collection))?;
        let position = coll
            .position(doc_name)
            .ok_or_else(|| StoreError::document_missing(doc_name))?;

        coll.remove(position)?;
        self.state.registry.remove(doc_name)?;

        debug!(collection, doc = doc_name, "deleted document");
        Ok(())
    }

    /// Text of a document, whichever collection holds it.
    pub fn get_document(&self, doc_name: &str) -> Result<&str> {
        self.state
            .registry
            .get(doc_name)
            .ok_or_else(|| StoreError::document_missing(doc_name))
    }

    /// `(doc_name, text)` pairs of a collection in position order.
    pub fn list_documents(&self, collection: &str) -> Result<Vec<(String, String)>> {
        let coll = self
            .state
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::collection_missing(collection))?;

        Ok(coll
            .names()
            .filter_map(|name| {
                self.state.registry.get(name).map(|text| (name.to_string(), text.to_string()))
            })
            .collect())
    }

    /// Returns up to `top_n` documents of `collection` closest to `query`.
    ///
    /// An empty collection yields no hits rather than an error, and `top_n` is
    /// clamped to the number of stored documents.
    ///
    /// # Examples
    ///
    /// ```
    /// use vecdocs::{EmbedderConfig, VecStore};
    ///
    /// let mut store = VecStore::new(EmbedderConfig::default()).unwrap();
    /// store.create_collection("kb", 384).unwrap();
    /// store.insert_document("kb", "doc1", "This is the first sample document.").unwrap();
    /// store.insert_document("kb", "doc2", "This is the second sample document.").unwrap();
    ///
    /// let hits = store.search("kb", "first", 1).unwrap();
    /// assert_eq!(hits.len(), 1);
    /// assert_eq!(hits[0].doc_name, "doc1");
    /// ```
    pub fn search(&self, collection: &str, query: &str, top_n: usize) -> Result<Vec<SearchHit>> {
        let coll = self
            .state
            .collections
            .get(collection)
            .ok_or_else(|| StoreError::collection_missing(collection))?;

        if coll.is_empty() {
            return Ok(Vec::new());
        }
        let top_n = top_n.min(coll.len());

        let query_vec = self.embedder.embed(query)?;
        let hits = coll
            .nearest(&query_vec, top_n)?
            .into_iter()
            .filter_map(|(name, distance)| {
                self.state.registry.get(name).map(|text| SearchHit {
                    doc_name: name.to_string(),
                    text: text.to_string(),
                    distance,
                })
            })
            .collect();

        Ok(hits)
    }

    /// Saves the whole store to `path` with bincode, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.state)?;
        writer.flush()?;

        info!(
            path = %path.display(),
            collections = self.collection_count(),
            documents = self.document_count(),
            "saved store"
        );
        Ok(())
    }

    /// Loads a store previously written by [`save`](VecStore::save).
    ///
    /// The embedder is rebuilt from the model configuration saved in the file.
    /// A file whose collections break the row/name alignment is rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<VecStore> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let state: StoreState = bincode::deserialize_from(reader)?;
        for (name, collection) in &state.collections {
            if let Err(e) = collection.validate() {
                warn!(path = %path.display(), collection = %name, error = %e, "rejecting saved store");
                return Err(e);
            }
        }
        let embedder = state.model.build()?;

        info!(
            path = %path.display(),
            collections = state.collections.len(),
            documents = state.registry.len(),
            "loaded store"
        );
        Ok(VecStore { state, embedder })
    }

    /// Loads `path` if it exists, otherwise starts an empty store with `model`.
    pub fn load_or_new(path: impl AsRef<Path>, model: EmbedderConfig) -> Result<VecStore> {
        let path = path.as_ref();
        if path.exists() {
            let store = VecStore::load(path)?;
            if store.model() != &model {
                warn!(
                    saved = ?store.model(),
                    requested = ?model,
                    "keeping the model configuration saved with the store"
                );
            }
            return Ok(store);
        }

        debug!(path = %path.display(), "no saved store, starting empty");
        VecStore::new(model)
    }
}
