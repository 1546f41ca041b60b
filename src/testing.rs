//! Test doubles for every pipeline capability.

use crate::document::{ContentSource, Metadata};
use crate::embedder::{Embedder, Embedding, HashingEmbedder};
use crate::error::{BenchError, Result};
use crate::evaluator::{Evaluator, F1Evaluator};
use crate::generation::{AnswerGenerator, QuestionGenerator};
use crate::observer::{RunObserver, SkipReason, Stage};
use crate::report::ResultRecord;
use crate::vector_store::{InMemoryVectorStore, SearchHit, VectorStore};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub const SAMPLE_TEXT: &str =
    "The quick brown fox jumps over the lazy dog. This is a sample text for testing purposes.";

/// A source whose resource is gone.
pub struct MissingSource;

#[async_trait]
impl ContentSource for MissingSource {
    async fn get_content(&self) -> Result<String> {
        Err(BenchError::SourceUnavailable("missing.pdf".to_string()))
    }
}

/// Hashing embedder that fails for selected texts or for whole batches.
#[derive(Default)]
pub struct ScriptedEmbedder {
    inner: HashingEmbedder,
    fail_texts: HashSet<String>,
    fail_batches: bool,
    short_batches: bool,
}

impl ScriptedEmbedder {
    pub fn failing_on(texts: &[&str]) -> Self {
        Self {
            fail_texts: texts.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing_batches() -> Self {
        Self {
            fail_batches: true,
            ..Default::default()
        }
    }

    /// Returns one fewer result than inputs from `embed_batch`.
    pub fn short_batches() -> Self {
        Self {
            short_batches: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        if self.fail_texts.contains(text) {
            return None;
        }
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        if self.fail_batches {
            return vec![None; texts.len()];
        }
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await);
        }
        if self.short_batches {
            out.pop();
        }
        out
    }
}

/// Returns a fixed list of questions, ignoring `n`.
pub struct FixedQuestions(pub Vec<String>);

impl FixedQuestions {
    pub fn new(questions: &[&str]) -> Self {
        Self(questions.iter().map(|q| q.to_string()).collect())
    }
}

#[async_trait]
impl QuestionGenerator for FixedQuestions {
    async fn generate(&self, _context: &str, _n: usize) -> Vec<String> {
        self.0.clone()
    }
}

/// Answers with the context it was given, optionally after a per-question
/// delay so concurrent runs finish out of order.
#[derive(Default)]
pub struct EchoAnswerer {
    pub delays: Vec<(String, Duration)>,
}

#[async_trait]
impl AnswerGenerator for EchoAnswerer {
    async fn generate(&self, question: &str, context: &str) -> String {
        if let Some((_, delay)) = self.delays.iter().find(|(q, _)| q == question) {
            tokio::time::sleep(*delay).await;
        }
        context.to_string()
    }
}

/// F1 evaluator that fails when the generated answer equals a given text.
pub struct FailingEvaluator {
    pub fail_on_generated: String,
}

#[async_trait]
impl Evaluator for FailingEvaluator {
    async fn evaluate(&self, generated: &str, reference: &str) -> Result<f64> {
        if generated == self.fail_on_generated {
            return Err(BenchError::Evaluation("scorer crashed".to_string()));
        }
        F1Evaluator.evaluate(generated, reference).await
    }
}

/// Returns a fixed score, in range or not.
pub struct ConstantEvaluator(pub f64);

#[async_trait]
impl Evaluator for ConstantEvaluator {
    async fn evaluate(&self, _generated: &str, _reference: &str) -> Result<f64> {
        Ok(self.0)
    }
}

/// In-memory store that logs every operation and can reject chosen ids or
/// refuse all searches.
pub struct LoggingStore {
    inner: InMemoryVectorStore,
    reject_ids: HashSet<String>,
    fail_search: bool,
    pub log: Mutex<Vec<String>>,
}

impl LoggingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryVectorStore::new("test"),
            reject_ids: HashSet::new(),
            fail_search: false,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(ids: &[&str]) -> Self {
        Self {
            reject_ids: ids.iter().map(|id| id.to_string()).collect(),
            ..Self::new()
        }
    }

    pub fn failing_search() -> Self {
        Self {
            fail_search: true,
            ..Self::new()
        }
    }

    pub fn operations(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorStore for LoggingStore {
    async fn add(&self, id: &str, vector: Embedding, metadata: Metadata) -> Result<()> {
        self.log.lock().unwrap().push(format!("add:{}", id));
        if self.reject_ids.contains(id) {
            return Err(BenchError::IndexWrite(format!("rejected {}", id)));
        }
        self.inner.add(id, vector, metadata).await
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.log.lock().unwrap().push("search".to_string());
        if self.fail_search {
            return Err(BenchError::Http("store offline".to_string()));
        }
        self.inner.search(query, k).await
    }

    async fn count(&self) -> usize {
        self.inner.count().await
    }
}

/// Collects observer events as strings.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RunObserver for RecordingObserver {
    fn stage_started(&self, stage: Stage) {
        self.push(format!("stage:{}", stage));
    }

    fn chunks_embedded(&self, chunks: usize, embedded: usize) {
        self.push(format!("embedded:{}/{}", embedded, chunks));
    }

    fn index_failed(&self, id: &str, _error: &BenchError) {
        self.push(format!("index_failed:{}", id));
    }

    fn search_failed(&self, question: &str, _error: &BenchError) {
        self.push(format!("search_failed:{}", question));
    }

    fn question_skipped(&self, question: &str, reason: &SkipReason) {
        let kind = match reason {
            SkipReason::EmbeddingFailed => "embedding",
            SkipReason::EvaluationFailed(_) => "evaluation",
        };
        self.push(format!("skipped:{}:{}", kind, question));
    }

    fn record_produced(&self, position: usize, _record: &ResultRecord) {
        self.push(format!("record:{}", position));
    }

    fn run_finished(&self, records: usize, indexed: usize) {
        self.push(format!("finished:{}/{}", records, indexed));
    }
}
