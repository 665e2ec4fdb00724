//! Embedding Module
//!
//! Provides text embedding generation for trend submissions. Two providers
//! sit behind the [`Embedder`] trait:
//! - [`EmbeddingEngine`]: FastEmbed (ONNX-based, local inference) with a
//!   sentence-transformers model.
//! - [`HashingEmbedder`]: deterministic feature hashing, no model download.

mod hashing;

pub use hashing::HashingEmbedder;

use crate::config::{AppConfig, EmbedderKind};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Default embedding model
const DEFAULT_MODEL: EmbeddingModel = EmbeddingModel::AllMiniLML6V2;

/// Embedding dimension for AllMiniLML6V2
pub const EMBEDDING_DIMENSION: usize = 384;

/// Default number of cached embeddings
const DEFAULT_CACHE_SIZE: usize = 1000;

/// Embedding errors
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyText,

    #[error("Failed to initialize embedding model: {0}")]
    ModelInit(String),

    #[error("Failed to generate embedding: {0}")]
    Inference(String),

    #[error("No embedding generated")]
    NoOutput,
}

/// Text embedding provider
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Identical input yields an identical vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension of the vectors this embedder produces
    fn dimension(&self) -> usize;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}

/// Create the embedder selected by configuration.
///
/// Model initialization failures are returned as errors; the engine cannot
/// run without an embedder.
pub async fn create_embedder(config: &AppConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.embedder {
        EmbedderKind::FastEmbed => {
            let engine =
                EmbeddingEngine::with_model(DEFAULT_MODEL, config.embedding_cache_size).await?;
            Ok(Arc::new(engine))
        }
        EmbedderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.hashing_dimension))),
    }
}

/// Embedding engine backed by FastEmbed
pub struct EmbeddingEngine {
    model: Arc<RwLock<TextEmbedding>>,
    cache: Arc<RwLock<LruCache<String, Vec<f32>>>>,
    model_name: String,
    dimension: usize,
}

impl EmbeddingEngine {
    /// Create a new embedding engine with default model
    pub async fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(DEFAULT_MODEL, DEFAULT_CACHE_SIZE).await
    }

    /// Create a new embedding engine with specific model and cache size
    pub async fn with_model(
        embedding_model: EmbeddingModel,
        cache_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let model_name = format!("{:?}", embedding_model);

        let init_options = InitOptions::new(embedding_model);

        let model = tokio::task::spawn_blocking(move || TextEmbedding::try_new(init_options))
            .await
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?
            .map_err(|e| EmbeddingError::ModelInit(e.to_string()))?;

        let cache = LruCache::new(NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN));

        tracing::info!("Embedding model {} ready", model_name);

        Ok(Self {
            model: Arc::new(RwLock::new(model)),
            cache: Arc::new(RwLock::new(cache)),
            model_name,
            dimension: EMBEDDING_DIMENSION,
        })
    }

    /// Embed a single text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        {
            let mut cache = self.cache.write().await;
            if let Some(cached) = cache.get(text) {
                return Ok(cached.clone());
            }
        }

        let text_owned = text.to_string();
        let model = self.model.clone();

        let embeddings = tokio::task::spawn_blocking(move || {
            let model_guard = futures::executor::block_on(model.read());
            model_guard.embed(vec![text_owned], None)
        })
        .await
        .map_err(|e| EmbeddingError::Inference(e.to_string()))?
        .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let embedding = embeddings.into_iter().next().ok_or(EmbeddingError::NoOutput)?;

        {
            let mut cache = self.cache.write().await;
            cache.put(text.to_string(), embedding.clone());
        }

        Ok(embedding)
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.read().await;
        (cache.len(), cache.cap().get())
    }
}

#[async_trait]
impl Embedder for EmbeddingEngine {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_text(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Helper to convert embedding to blob for SQLite storage
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Helper to convert blob from SQLite to embedding
pub fn blob_to_embedding(blob: &[u8]) -> anyhow::Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        anyhow::bail!("Invalid blob size for f32 array: {} bytes", blob.len());
    }

    let embedding = blob
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    Ok(embedding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Downloads the ONNX model
    async fn test_embedding_engine() {
        let engine = EmbeddingEngine::new().await.unwrap();

        let embedding = engine.embed_text("mob wife aesthetic tiktok outfits").await.unwrap();

        assert_eq!(embedding.len(), EMBEDDING_DIMENSION);
    }

    #[tokio::test]
    #[ignore] // Downloads the ONNX model
    async fn test_cache() {
        let engine = EmbeddingEngine::new().await.unwrap();

        let emb1 = engine.embed_text("Cached text").await.unwrap();
        let emb2 = engine.embed_text("Cached text").await.unwrap();

        assert_eq!(emb1, emb2);

        let (used, capacity) = engine.cache_stats().await;
        assert_eq!(used, 1);
        assert!(capacity > 0);
    }

    #[test]
    fn test_embedding_serialization() {
        let original = vec![1.0, 2.5, -3.7, 0.0, 4.2];
        let blob = embedding_to_blob(&original);
        assert_eq!(blob.len(), 20);

        let restored = blob_to_embedding(&blob).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_blob_with_bad_length_is_rejected() {
        assert!(blob_to_embedding(&[0u8, 1, 2]).is_err());
    }

    #[tokio::test]
    async fn test_create_hashing_embedder_from_config() {
        let config = AppConfig {
            embedder: EmbedderKind::Hashing,
            hashing_dimension: 64,
            ..AppConfig::default()
        };

        let embedder = create_embedder(&config).await.unwrap();
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.embed("dark academia").await.unwrap().len(), 64);
    }
}
