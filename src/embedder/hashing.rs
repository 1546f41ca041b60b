//! Offline feature-hashing embedder.

use super::{Embedder, Embedding, normalize};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic bag-of-words embedder that needs no network or model files.
///
/// Each lower-cased token is hashed into one of `dimensions` buckets with a
/// hash-derived sign, and the result is L2-normalised. Identical texts always
/// embed identically; texts sharing words land close together.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_sync(&self, text: &str) -> Option<Embedding> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return None;
        }

        normalize(&mut vector);
        Some(vector)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        self.embed_sync(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        texts.iter().map(|t| self.embed_sync(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_has_configured_dimension() {
        let embedder = HashingEmbedder::new(64);
        let embedding = embedder.embed("the quick brown fox").await.unwrap();
        assert_eq!(embedding.len(), 64);
    }

    #[tokio::test]
    async fn test_identical_text_embeds_identically() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("The Fox jumps.").await.unwrap();
        let b = embedder.embed("the fox jumps").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_related_text_is_closer() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed("what does the fox do").await.unwrap();
        let related = embedder.embed("the fox jumps over the dog").await.unwrap();
        let unrelated = embedder.embed("compilers emit machine code").await.unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_text_without_tokens_fails() {
        let embedder = HashingEmbedder::default();
        assert!(embedder.embed("   ").await.is_none());
        assert!(embedder.embed("... !!").await.is_none());
    }

    #[tokio::test]
    async fn test_batch_is_aligned_with_input() {
        let embedder = HashingEmbedder::default();
        let texts = vec!["alpha".to_string(), "".to_string(), "beta".to_string()];
        let embeddings = embedder.embed_batch(&texts).await;

        assert_eq!(embeddings.len(), 3);
        assert!(embeddings[0].is_some());
        assert!(embeddings[1].is_none());
        assert!(embeddings[2].is_some());
    }
}
