//! Benchmark orchestrator.
//!
//! Drives one run of the pipeline:
//!
//! 1. fetch the document text (the only fatal stage) and its metadata
//! 2. chunk it
//! 3. batch-embed the chunks and drop the ones that failed
//! 4. index the survivors as `chunk_0`, `chunk_1`, ...
//! 5. generate questions from the full text
//! 6. per question: embed, retrieve top-k, answer from the retrieved context
//!    and from the full text, then score the two answers
//!
//! Indexing finishes before the first question is processed, and records
//! come back in question order even when questions run concurrently.

use crate::chunker::Chunker;
use crate::config::BenchmarkSettings;
use crate::document::{ContentSource, Document, Metadata, TextSource};
use crate::embedder::{Embedder, Embedding, usable};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::generation::{AnswerGenerator, QuestionGenerator};
use crate::observer::{RunObserver, SkipReason, Stage, TracingObserver};
use crate::report::{ResultRecord, RunMetadata, RunReport};
use crate::vector_store::{SearchHit, VectorStore};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Separator placed between retrieved chunk texts.
const CONTEXT_SEPARATOR: &str = " ";

/// Configuration for the benchmark.
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Number of questions requested from the question generator.
    pub num_questions: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Questions processed at once; 1 runs them strictly in sequence.
    pub question_concurrency: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            num_questions: 10,
            top_k: 3,
            question_concurrency: 1,
        }
    }
}

impl From<&BenchmarkSettings> for BenchmarkConfig {
    fn from(settings: &BenchmarkSettings) -> Self {
        Self {
            num_questions: settings.num_questions,
            top_k: settings.top_k,
            question_concurrency: settings.question_concurrency,
        }
    }
}

struct RunOutcome {
    document: Document,
    records: Vec<ResultRecord>,
    num_chunks: usize,
    num_questions: usize,
}

/// Benchmark runner.
///
/// Owns one instance of each capability. The vector store is populated by
/// the run, so every run should get a fresh store.
pub struct Benchmark {
    source: Arc<dyn ContentSource>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    question_generator: Arc<dyn QuestionGenerator>,
    answer_generator: Arc<dyn AnswerGenerator>,
    evaluator: Arc<dyn Evaluator>,
    config: BenchmarkConfig,
    observer: Arc<dyn RunObserver>,
    run_lock: Mutex<()>,
}

impl Benchmark {
    /// Create a new benchmark runner with the default configuration.
    pub fn new(
        source: Arc<dyn ContentSource>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        question_generator: Arc<dyn QuestionGenerator>,
        answer_generator: Arc<dyn AnswerGenerator>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            source,
            chunker,
            embedder,
            vector_store,
            question_generator,
            answer_generator,
            evaluator,
            config: BenchmarkConfig::default(),
            observer: Arc::new(TracingObserver),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: BenchmarkConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }

    /// Run the pipeline and return one record per scored question.
    pub async fn run(&self) -> Result<Vec<ResultRecord>> {
        Ok(self.execute().await?.records)
    }

    /// Run the pipeline and return the records with the input text and run
    /// metadata.
    pub async fn run_report(&self) -> Result<RunReport> {
        let outcome = self.execute().await?;
        Ok(RunReport {
            input_content: outcome.document.content,
            results: outcome.records,
            metadata: RunMetadata {
                num_chunks: outcome.num_chunks,
                num_questions: outcome.num_questions,
                document: outcome.document.metadata,
            },
        })
    }

    /// Benchmark raw text that has already been extracted from its source,
    /// using the default configuration.
    pub async fn evaluate_scraped_content(
        content: impl Into<String>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        question_generator: Arc<dyn QuestionGenerator>,
        answer_generator: Arc<dyn AnswerGenerator>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<RunReport> {
        Self::evaluate_scraped_content_with_config(
            content,
            BenchmarkConfig::default(),
            chunker,
            embedder,
            vector_store,
            question_generator,
            answer_generator,
            evaluator,
        )
        .await
    }

    /// Like [`Benchmark::evaluate_scraped_content`] with an explicit
    /// configuration.
    #[allow(clippy::too_many_arguments)]
    pub async fn evaluate_scraped_content_with_config(
        content: impl Into<String>,
        config: BenchmarkConfig,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        question_generator: Arc<dyn QuestionGenerator>,
        answer_generator: Arc<dyn AnswerGenerator>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Result<RunReport> {
        Self::new(
            Arc::new(TextSource::new(content)),
            chunker,
            embedder,
            vector_store,
            question_generator,
            answer_generator,
            evaluator,
        )
        .with_config(config)
        .run_report()
        .await
    }

    async fn execute(&self) -> Result<RunOutcome> {
        // One run at a time per instance.
        let _guard = self.run_lock.lock().await;

        self.observer.stage_started(Stage::Fetch);
        let document = Document::fetch(self.source.as_ref()).await?;
        let content = document.content.as_str();

        self.observer.stage_started(Stage::Chunk);
        let chunks = self.chunker.chunk(content).await;

        self.observer.stage_started(Stage::EmbedChunks);
        let indexable = self.embed_chunks(chunks).await;

        self.observer.stage_started(Stage::Index);
        self.index_chunks(indexable).await;

        self.observer.stage_started(Stage::GenerateQuestions);
        let requested = self.config.num_questions;
        let mut questions = self.question_generator.generate(content, requested).await;
        questions.truncate(requested);
        self.observer.questions_generated(requested, questions.len());

        self.observer.stage_started(Stage::AnswerQuestions);
        let records: Vec<ResultRecord> = stream::iter(questions.iter().enumerate())
            .map(|(position, question)| self.answer_question(position, question, content))
            .buffered(self.config.question_concurrency.max(1))
            .filter_map(futures::future::ready)
            .collect()
            .await;

        let num_chunks = self.vector_store.count().await;
        self.observer.run_finished(records.len(), num_chunks);

        Ok(RunOutcome {
            document,
            records,
            num_chunks,
            num_questions: questions.len(),
        })
    }

    /// Embed all chunks in one batch and keep the pairs whose embedding
    /// succeeded, in chunk order.
    async fn embed_chunks(&self, chunks: Vec<String>) -> Vec<(String, Embedding)> {
        if chunks.is_empty() {
            self.observer.chunks_embedded(0, 0);
            return Vec::new();
        }

        let total = chunks.len();
        let embeddings = self.embedder.embed_batch(&chunks).await;

        // A misaligned batch cannot be paired with its chunks.
        let embeddings = if embeddings.len() == total {
            embeddings
        } else {
            vec![None; total]
        };

        let indexable: Vec<(String, Embedding)> = chunks
            .into_iter()
            .zip(embeddings)
            .filter_map(|(chunk, embedding)| usable(embedding).map(|e| (chunk, e)))
            .collect();

        self.observer.chunks_embedded(total, indexable.len());
        indexable
    }

    async fn index_chunks(&self, indexable: Vec<(String, Embedding)>) {
        for (i, (chunk, embedding)) in indexable.into_iter().enumerate() {
            let id = format!("chunk_{}", i);
            let mut metadata = Metadata::new();
            metadata.insert("text".to_string(), Value::String(chunk));

            if let Err(e) = self.vector_store.add(&id, embedding, metadata).await {
                self.observer.index_failed(&id, &e);
            }
        }
    }

    async fn answer_question(
        &self,
        position: usize,
        question: &str,
        content: &str,
    ) -> Option<ResultRecord> {
        let Some(query) = usable(self.embedder.embed(question).await) else {
            self.observer
                .question_skipped(question, &SkipReason::EmbeddingFailed);
            return None;
        };

        let hits = match self.vector_store.search(&query, self.config.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                self.observer.search_failed(question, &e);
                Vec::new()
            }
        };

        let context = hits
            .iter()
            .map(SearchHit::text)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let generated_answer = self.answer_generator.generate(question, &context).await;
        let reference_answer = self.answer_generator.generate(question, content).await;

        let score = match self
            .evaluator
            .evaluate(&generated_answer, &reference_answer)
            .await
        {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            Ok(score) => {
                let reason = SkipReason::EvaluationFailed(format!("non-finite score {}", score));
                self.observer.question_skipped(question, &reason);
                return None;
            }
            Err(e) => {
                let reason = SkipReason::EvaluationFailed(e.to_string());
                self.observer.question_skipped(question, &reason);
                return None;
            }
        };

        let record = ResultRecord {
            question: question.to_string(),
            generated_answer,
            reference_answer,
            score,
        };
        self.observer.record_produced(position, &record);
        Some(record)
    }
}
