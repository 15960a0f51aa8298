//! # vecdocs - A Small Persistent Vector-Document Store
//!
//! Documents live in named collections. Each document's text is embedded into
//! a fixed-length vector and kept in an exact L2 index, so a collection can be
//! searched by text for its nearest documents. Document names are unique
//! across the whole store. The entire store is saved to and loaded from a
//! single file.
//!
//! ## Example
//!
//! ```
//! use vecdocs::{EmbedderConfig, VecStore};
//!
//! let mut store = VecStore::new(EmbedderConfig::default()).unwrap();
//! store.create_collection("kb", 384).unwrap();
//!
//! store.insert_document("kb", "doc1", "This is the first sample document.").unwrap();
//! store.insert_document("kb", "doc2", "This is the second sample document.").unwrap();
//!
//! // Nearest document first
//! let hits = store.search("kb", "first", 1).unwrap();
//! assert_eq!(hits[0].doc_name, "doc1");
//! ```

pub mod collection;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod registry;
pub mod server;
pub mod vector;
mod db;

// Re-export the store as the primary public API
pub use db::{SearchHit, VecStore};
pub use embed::{Embedder, EmbedderConfig};
pub use error::{Result, StoreError};
