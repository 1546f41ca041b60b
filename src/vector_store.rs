//! Vector index used for retrieval.

use crate::document::Metadata;
use crate::embedder::{Embedding, cosine_similarity, squared_l2};
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::debug;

/// A single nearest-neighbour match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    /// Distance to the query; smaller is more similar.
    pub score: f32,
    pub metadata: Metadata,
}

impl SearchHit {
    /// The chunk text stored under the `text` metadata key.
    pub fn text(&self) -> &str {
        self.metadata
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }
}

/// Stores `(id, vector, metadata)` triples and answers nearest-neighbour
/// queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add an item. Fails with [`BenchError::IndexWrite`] if `id` already
    /// exists or `vector` is empty.
    async fn add(&self, id: &str, vector: Embedding, metadata: Metadata) -> Result<()>;

    /// Up to `k` items ordered by increasing distance to `query`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Number of indexed items.
    async fn count(&self) -> usize;
}

/// Distance used to rank matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    SquaredL2,
    /// `1 - cosine similarity`.
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::SquaredL2 => squared_l2(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

struct IndexedItem {
    id: String,
    vector: Embedding,
    metadata: Metadata,
}

#[derive(Default)]
struct Collection {
    items: Vec<IndexedItem>,
    ids: HashSet<String>,
}

/// Exact brute-force index held in memory.
pub struct InMemoryVectorStore {
    name: String,
    metric: DistanceMetric,
    collection: RwLock<Collection>,
}

impl InMemoryVectorStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_metric(name, DistanceMetric::default())
    }

    pub fn with_metric(name: impl Into<String>, metric: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            metric,
            collection: RwLock::new(Collection::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, id: &str, vector: Embedding, metadata: Metadata) -> Result<()> {
        if vector.is_empty() {
            return Err(BenchError::IndexWrite(format!(
                "empty vector for id '{}'",
                id
            )));
        }

        let mut collection = self.collection.write().await;

        if collection.ids.contains(id) {
            return Err(BenchError::IndexWrite(format!(
                "id '{}' already exists in collection '{}'",
                id, self.name
            )));
        }

        if let Some(first) = collection.items.first() {
            if first.vector.len() != vector.len() {
                return Err(BenchError::IndexWrite(format!(
                    "vector for id '{}' has dimension {}, collection '{}' expects {}",
                    id,
                    vector.len(),
                    self.name,
                    first.vector.len()
                )));
            }
        }

        collection.ids.insert(id.to_string());
        collection.items.push(IndexedItem {
            id: id.to_string(),
            vector,
            metadata,
        });
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let collection = self.collection.read().await;

        if collection.items.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f32, &IndexedItem)> = collection
            .items
            .iter()
            .map(|item| (self.metric.distance(query, &item.vector), item))
            .collect();

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!(
            "Search in '{}' returned {} of {} items",
            self.name,
            scored.len(),
            collection.items.len()
        );

        Ok(scored
            .into_iter()
            .map(|(score, item)| SearchHit {
                id: item.id.clone(),
                score,
                metadata: item.metadata.clone(),
            })
            .collect())
    }

    async fn count(&self) -> usize {
        self.collection.read().await.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn text_meta(text: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), Value::from(text));
        metadata
    }

    #[tokio::test]
    async fn test_search_returns_own_item_first() {
        let store = InMemoryVectorStore::new("test");
        let embedding = vec![0.1; 1536];
        store
            .add("test_id", embedding.clone(), text_meta("sample"))
            .await
            .unwrap();

        let hits = store.search(&embedding, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "test_id");
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits[0].text(), "sample");
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let store = InMemoryVectorStore::new("test");
        store.add("far", vec![10.0, 0.0], text_meta("far")).await.unwrap();
        store.add("near", vec![1.0, 0.0], text_meta("near")).await.unwrap();
        store.add("mid", vec![5.0, 0.0], text_meta("mid")).await.unwrap();

        let hits = store.search(&[0.0, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(hits.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[tokio::test]
    async fn test_search_returns_fewer_than_k() {
        let store = InMemoryVectorStore::new("test");
        store.add("a", vec![1.0, 0.0], text_meta("a")).await.unwrap();
        store.add("b", vec![0.0, 1.0], text_meta("b")).await.unwrap();

        let hits = store.search(&[1.0, 1.0], 5).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let store = InMemoryVectorStore::new("test");
        assert!(store.search(&[1.0], 3).await.unwrap().is_empty());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryVectorStore::new("test");
        store.add("a", vec![1.0], text_meta("a")).await.unwrap();

        let result = store.add("a", vec![2.0], text_meta("again")).await;
        assert!(matches!(result, Err(BenchError::IndexWrite(_))));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_empty_vector_rejected() {
        let store = InMemoryVectorStore::new("test");
        let result = store.add("a", Vec::new(), text_meta("a")).await;
        assert!(matches!(result, Err(BenchError::IndexWrite(_))));
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new("test");
        store.add("a", vec![1.0, 0.0], text_meta("a")).await.unwrap();
        let result = store.add("b", vec![1.0], text_meta("b")).await;
        assert!(matches!(result, Err(BenchError::IndexWrite(_))));
    }

    #[tokio::test]
    async fn test_cosine_metric() {
        let store = InMemoryVectorStore::with_metric("test", DistanceMetric::Cosine);
        store.add("same", vec![2.0, 0.0], text_meta("same")).await.unwrap();
        store.add("orth", vec![0.0, 3.0], text_meta("orth")).await.unwrap();

        let hits = store.search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits[0].id, "same");
        assert!(hits[0].score.abs() < 1e-6);
        assert!((hits[1].score - 1.0).abs() < 1e-6);
    }
}
