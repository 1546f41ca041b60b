//! Text embedding.
//!
//! Embedders map text to fixed-dimension vectors. Failures are reported as
//! `None` rather than errors so a batch can be filtered without aborting.

mod hashing;
mod openai;

#[cfg(feature = "local-embeddings")]
mod candle;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

#[cfg(feature = "local-embeddings")]
pub use candle::CandleEmbedder;

use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, warn};

/// A point in the embedder's vector space.
pub type Embedding = Vec<f32>;

/// Maps text to embeddings, one at a time or in batches.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. `None` means the embedding failed.
    async fn embed(&self, text: &str) -> Option<Embedding>;

    /// Embed a batch of texts.
    ///
    /// The result always has one entry per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await);
        }
        embeddings
    }
}

/// Treat a zero-length vector the same as a failed embedding.
pub fn usable(embedding: Option<Embedding>) -> Option<Embedding> {
    embedding.filter(|v| !v.is_empty())
}

/// Embed `texts` in slices of at most `batch_size`, calling `embed` once per
/// slice. A slice that fails, or returns the wrong number of vectors, yields
/// `None` for each of its inputs; the other slices are unaffected.
pub(crate) async fn embed_in_batches<F, Fut>(
    texts: &[String],
    batch_size: usize,
    mut embed: F,
) -> Vec<Option<Embedding>>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<Embedding>>>,
{
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        match embed(batch.to_vec()).await {
            Ok(vectors) if vectors.len() == batch.len() => {
                debug!("Embedded batch of {} texts", batch.len());
                embeddings.extend(vectors.into_iter().map(Some));
            }
            Ok(vectors) => {
                warn!(
                    "Embedding backend returned {} vectors for {} inputs",
                    vectors.len(),
                    batch.len()
                );
                embeddings.extend(std::iter::repeat_n(None, batch.len()));
            }
            Err(e) => {
                warn!("Batch embedding of {} texts failed: {}", batch.len(), e);
                embeddings.extend(std::iter::repeat_n(None, batch.len()));
            }
        }
    }

    embeddings
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Scale a vector to unit length in place. Zero vectors are left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
