//! Feature-hashing embedder
//!
//! Maps lowercase word tokens and their character trigrams into a fixed number
//! of buckets using SHA-256, then L2-normalizes the result. Deterministic across
//! runs and platforms, so it works offline and in tests.

use super::{Embedder, EmbeddingError};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[\p{L}\p{N}]+").expect("valid token regex");
}

const TOKEN_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic bag-of-features embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_name: format!("hashing-{}", dimension),
        }
    }

    /// Compute the embedding synchronously
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.to_lowercase();
        let mut vector = vec![0.0f32; self.dimension];
        let mut features = 0usize;

        for token in TOKEN_RE.find_iter(&lowered).map(|m| m.as_str()) {
            self.add_feature(&mut vector, token, TOKEN_WEIGHT);
            features += 1;

            let padded: Vec<char> = format!("#{}#", token).chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        if features == 0 {
            return Err(EmbeddingError::EmptyText);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            return Err(EmbeddingError::NoOutput);
        }
        for val in vector.iter_mut() {
            *val /= norm;
        }

        Ok(vector)
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut index_bytes = [0u8; 8];
        index_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(index_bytes) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::metrics::cosine_similarity;

    #[test]
    fn test_deterministic() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed_sync("office siren blazers").unwrap();
        let b = embedder.embed_sync("office siren blazers").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 384);
    }

    #[test]
    fn test_unit_norm() {
        let embedder = HashingEmbedder::new(128);
        let v = embedder.embed_sync("Y2K cyber fashion").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashingEmbedder::new(384);
        let a = embedder.embed_sync("Clean Girl, minimal makeup!").unwrap();
        let b = embedder.embed_sync("clean girl minimal makeup").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_shared_words_score_higher() {
        let embedder = HashingEmbedder::new(384);
        let base = embedder.embed_sync("mob wife aesthetic fur coats").unwrap();
        let close = embedder.embed_sync("mob wife aesthetic sunglasses").unwrap();
        let far = embedder.embed_sync("dark academia libraries").unwrap();

        assert!(cosine_similarity(&base, &close) > cosine_similarity(&base, &far));
    }

    #[test]
    fn test_rejects_text_without_tokens() {
        let embedder = HashingEmbedder::new(384);
        assert!(matches!(embedder.embed_sync(""), Err(EmbeddingError::EmptyText)));
        assert!(matches!(embedder.embed_sync("  ?! "), Err(EmbeddingError::EmptyText)));
    }
}
