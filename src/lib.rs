//! DocQA Bench - an end-to-end benchmark for retrieval-augmented question
//! answering over a single document.
//!
//! # Overview
//!
//! A run takes one document and:
//! 1. Splits it into overlapping chunks and indexes their embeddings
//! 2. Asks an LLM to generate questions about the document
//! 3. Answers each question twice: from the top-k retrieved chunks and from
//!    the full document
//! 4. Scores the retrieval-based answer against the full-document answer
//!
//! The full-document answer is the reference, so the score measures how much
//! the retrieval pipeline loses compared to giving the model everything.
//!
//! # Quick Start
//!
//! ```no_run
//! use docqa_bench::{
//!     benchmark::{Benchmark, BenchmarkConfig},
//!     chunker::RecursiveChunker,
//!     config::Config,
//!     document::FileSource,
//!     embedder::OpenAiEmbedder,
//!     evaluator::F1Evaluator,
//!     generation::{LlmAnswerGenerator, LlmQuestionGenerator},
//!     llm::LlmClient,
//!     vector_store::InMemoryVectorStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let client = LlmClient::new(config.llm.clone())?;
//!
//!     let benchmark = Benchmark::new(
//!         Arc::new(FileSource::new("document.txt")),
//!         Arc::new(RecursiveChunker::from_config(&config.chunking)?),
//!         Arc::new(OpenAiEmbedder::new(config.resolved_embedding())?),
//!         Arc::new(InMemoryVectorStore::new("benchmark_collection")),
//!         Arc::new(LlmQuestionGenerator::new(client.clone())),
//!         Arc::new(LlmAnswerGenerator::new(client)),
//!         Arc::new(F1Evaluator),
//!     )
//!     .with_config(BenchmarkConfig::from(&config.benchmark));
//!
//!     let report = benchmark.run_report().await?;
//!     println!("{}", report.summary());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **ContentSource**: supplies the document text (plain text, files, directories, PDFs)
//! - **Chunker**: splits text into overlapping chunks
//! - **Embedder**: maps text to vectors, `None` on failure
//! - **VectorStore**: nearest-neighbour index over chunk embeddings
//! - **QuestionGenerator / AnswerGenerator**: LLM-backed generation
//! - **Evaluator**: scores generated answers against reference answers
//! - **Benchmark**: wires the capabilities together and runs the pipeline

pub mod benchmark;
pub mod chunker;
pub mod config;
pub mod document;
pub mod embedder;
pub mod error;
pub mod evaluator;
pub mod generation;
pub mod llm;
pub mod observer;
pub mod report;
pub mod vector_store;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use benchmark::{Benchmark, BenchmarkConfig};
pub use chunker::{Chunker, RecursiveChunker};
pub use config::Config;
pub use document::{ContentSource, DirectorySource, Document, FileSource, PdfSource, TextSource};
pub use embedder::{Embedder, Embedding, HashingEmbedder, OpenAiEmbedder};
pub use error::{BenchError, Result};
pub use evaluator::{Evaluator, F1Evaluator, LlmJudgeEvaluator};
pub use generation::{AnswerGenerator, LlmAnswerGenerator, LlmQuestionGenerator, QuestionGenerator};
pub use llm::LlmClient;
pub use observer::{RunObserver, TracingObserver};
pub use report::{ResultRecord, RunReport};
pub use vector_store::{DistanceMetric, InMemoryVectorStore, VectorStore};
