//! Error types shared by the store, the embedders and the HTTP layer.

use std::fmt;

use thiserror::Error;

/// What kind of named thing an `AlreadyExists` / `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Collection,
    Document,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Collection => f.write_str("Collection"),
            Entity::Document => f.write_str("Document"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A collection or document name is already taken.
    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: Entity, name: String },

    /// A referenced collection or document does not exist.
    #[error("{kind} '{name}' does not exist")]
    NotFound { kind: Entity, name: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid dimension {0}: must be greater than zero")]
    InvalidDimension(usize),

    #[error("invalid vector: {0}")]
    InvalidVector(&'static str),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

impl StoreError {
    pub(crate) fn collection_exists(name: &str) -> Self {
        StoreError::AlreadyExists { kind: Entity::Collection, name: name.to_string() }
    }

    pub(crate) fn collection_missing(name: &str) -> Self {
        StoreError::NotFound { kind: Entity::Collection, name: name.to_string() }
    }

    pub(crate) fn document_exists(name: &str) -> Self {
        StoreError::AlreadyExists { kind: Entity::Document, name: name.to_string() }
    }

    pub(crate) fn document_missing(name: &str) -> Self {
        StoreError::NotFound { kind: Entity::Document, name: name.to_string() }
    }

    /// A saved store whose contents break the store's own invariants.
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        StoreError::Serialization(Box::new(bincode::ErrorKind::Custom(reason.into())))
    }

    /// True for errors caused by the caller's input rather than by the store itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::AlreadyExists { .. }
                | StoreError::NotFound { .. }
                | StoreError::DimensionMismatch { .. }
                | StoreError::InvalidDimension(_)
                | StoreError::InvalidVector(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
