//! Text embedders.
//!
//! The store only needs `text -> fixed-length vector`. [`EmbedderConfig`] is
//! the serializable description saved with the store; [`EmbedderConfig::build`]
//! turns it into a live [`Embedder`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::vector::l2_norm;

/// Width of the default sentence-embedding model.
pub const DEFAULT_DIMENSION: usize = 384;

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/paraphrase-MiniLM-L6-v2";

pub trait Embedder: Send + Sync {
    /// Length of every vector returned by [`embed`](Embedder::embed).
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbedderConfig {
    /// Feature-hashed bag of words. Deterministic and needs no model files.
    Hashing { dimension: usize },
    /// BERT-family sentence model pulled from the Hugging Face hub.
    Bert { model_id: String },
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        EmbedderConfig::Hashing { dimension: DEFAULT_DIMENSION }
    }
}

impl EmbedderConfig {
    pub fn build(&self) -> Result<Arc<dyn Embedder>> {
        match self {
            EmbedderConfig::Hashing { dimension } => Ok(Arc::new(HashingEmbedder::new(*dimension)?)),
            EmbedderConfig::Bert { model_id } => build_bert(model_id),
        }
    }
}

#[cfg(feature = "bert")]
fn build_bert(model_id: &str) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(bert::BertEmbedder::from_hub(model_id)?))
}

#[cfg(not(feature = "bert"))]
fn build_bert(model_id: &str) -> Result<Arc<dyn Embedder>> {
    Err(StoreError::Embedding(format!(
        "model '{}' requires building with the `bert` feature",
        model_id
    )))
}

/// Hashing-trick embedder.
///
/// Text is split into lowercase alphanumeric tokens. Each token's hash picks a
/// bucket (high 32 bits) and a sign (lowest bit); the summed vector is
/// L2-normalized. Text without any token embeds to the zero vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension(dimension));
        }
        Ok(HashingEmbedder { dimension })
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let hash = token_hash(&token.to_lowercase());
            let bucket = ((hash >> 32) % self.dimension as u64) as usize;
            let sign = if hash & 1 == 1 { -1.0 } else { 1.0 };
            vector[bucket] += sign;
        }

        // Tokens may cancel out; a zero vector stays as is.
        match l2_norm(&vector) {
            Ok(normed) => Ok(normed),
            Err(_) => Ok(vector),
        }
    }
}

/// FNV-1a followed by the murmur3 finalizer, so short tokens spread over the high bits.
fn token_hash(token: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut h = token.bytes().fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME));
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

#[cfg(feature = "bert")]
mod bert {
    use candle_core::{DType, Device, Tensor};
    use candle_nn::VarBuilder;
    use candle_transformers::models::bert::{BertModel, Config};
    use hf_hub::{api::sync::Api, Repo, RepoType};
    use tokenizers::Tokenizer;

    use super::Embedder;
    use crate::error::{Result, StoreError};

    fn model_err(e: impl std::fmt::Display) -> StoreError {
        StoreError::Embedding(e.to_string())
    }

    /// Mean-pooled BERT sentence embeddings.
    pub struct BertEmbedder {
        model: BertModel,
        tokenizer: Tokenizer,
        device: Device,
        dimension: usize,
    }

    impl BertEmbedder {
        pub fn from_hub(model_id: &str) -> Result<Self> {
            let device = Device::cuda_if_available(0).map_err(model_err)?;

            tracing::info!(model_id, "fetching embedding model");
            let api = Api::new().map_err(model_err)?;
            let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

            let tokenizer_path = repo.get("tokenizer.json").map_err(model_err)?;
            let config_path = repo.get("config.json").map_err(model_err)?;
            let weights_path = repo.get("model.safetensors").map_err(model_err)?;

            let raw_config = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&raw_config).map_err(model_err)?;
            let dimension = serde_json::from_str::<serde_json::Value>(&raw_config)
                .map_err(model_err)?
                .get("hidden_size")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| model_err("config.json has no hidden_size"))? as usize;

            let tokenizer = Tokenizer::from_file(tokenizer_path).map_err(model_err)?;

            // SAFETY: the weights file is owned by the hub cache and not modified while mapped.
            let vb = unsafe {
                VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                    .map_err(model_err)?
            };
            let model = BertModel::load(vb, &config).map_err(model_err)?;
            tracing::info!(model_id, dimension, "embedding model loaded");

            Ok(BertEmbedder { model, tokenizer, device, dimension })
        }

        fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| candle_core::Error::Msg(e.to_string()))?;
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();

            let ids = Tensor::from_vec(ids.to_vec(), (1, ids.len()), &self.device)?;
            let mask = Tensor::from_vec(mask.to_vec(), (1, mask.len()), &self.device)?;
            let type_ids = ids.zeros_like()?;

            let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;
            let pooled = mean_pooling(&hidden, &mask)?;
            pooled.get(0)?.to_vec1()
        }
    }

    fn mean_pooling(hidden_states: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .broadcast_as(hidden_states.shape())?
            .to_dtype(hidden_states.dtype())?;
        let sum_embeddings = (hidden_states * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        sum_embeddings.broadcast_div(&sum_mask)
    }

    impl Embedder for BertEmbedder {
        fn dimension(&self) -> usize {
            self.dimension
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.forward(text).map_err(model_err)
        }
    }
}
