//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::embed::{EmbedderConfig, DEFAULT_DIMENSION, DEFAULT_MODEL_ID};

#[derive(Parser, Debug)]
#[command(name = "vecdocs")]
#[command(about = "A small persistent vector-document store")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the store lives and how it embeds text.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Path of the store file
    #[arg(long, global = true, env = "VECDOCS_DB", default_value = "vectordb.bin")]
    pub db: PathBuf,

    /// Embedding model used when a new store is created
    #[arg(long, global = true, value_enum, env = "VECDOCS_EMBEDDER", default_value_t = EmbedderKind::Hashing)]
    pub embedder: EmbedderKind,

    /// Output width of the hashing embedder
    #[arg(long, global = true, env = "VECDOCS_HASH_DIM", default_value_t = DEFAULT_DIMENSION)]
    pub hash_dim: usize,

    /// Hugging Face model id for the bert embedder
    #[arg(long, global = true, env = "VECDOCS_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Hashing,
    Bert,
}

impl StoreArgs {
    pub fn embedder_config(&self) -> EmbedderConfig {
        match self.embedder {
            EmbedderKind::Hashing => EmbedderConfig::Hashing { dimension: self.hash_dim },
            EmbedderKind::Bert => EmbedderConfig::Bert { model_id: self.model_id.clone() },
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, env = "VECDOCS_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, env = "VECDOCS_PORT", default_value_t = 8000)]
        port: u16,
    },

    /// Create a collection
    Create {
        name: String,

        /// Vector length of the collection
        #[arg(long, default_value_t = DEFAULT_DIMENSION)]
        dimension: usize,
    },

    /// List collection names
    Collections,

    /// Drop a collection and all of its documents
    Drop { name: String },

    /// Insert a document into a collection
    Insert {
        collection: String,
        doc_name: String,
        text: String,
    },

    /// Replace the text of a document
    Update {
        collection: String,
        doc_name: String,
        text: String,
    },

    /// Delete a document from a collection
    Delete { collection: String, doc_name: String },

    /// Search a collection by text
    Search {
        collection: String,
        query: String,

        /// Number of results
        #[arg(long, default_value_t = 5)]
        top_n: usize,
    },

    /// Print the text of a document
    Get { doc_name: String },

    /// List the documents of a collection
    Docs { collection: String },
}

impl Command {
    /// Whether running the command changes the store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Create { .. }
                | Command::Drop { .. }
                | Command::Insert { .. }
                | Command::Update { .. }
                | Command::Delete { .. }
        )
    }
}
