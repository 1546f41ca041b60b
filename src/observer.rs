//! Run progress reporting.
//!
//! The orchestrator reports what happens during a run through an injected
//! [`RunObserver`] instead of writing to a global logger.

use crate::error::BenchError;
use crate::report::ResultRecord;
use std::fmt;
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Chunk,
    EmbedChunks,
    Index,
    GenerateQuestions,
    AnswerQuestions,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Chunk => "chunk",
            Stage::EmbedChunks => "embed-chunks",
            Stage::Index => "index",
            Stage::GenerateQuestions => "generate-questions",
            Stage::AnswerQuestions => "answer-questions",
        };
        f.write_str(name)
    }
}

/// Why a question produced no result record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    EmbeddingFailed,
    EvaluationFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmbeddingFailed => f.write_str("question embedding failed"),
            SkipReason::EvaluationFailed(e) => write!(f, "evaluation failed: {}", e),
        }
    }
}

/// Receives progress events from a benchmark run. Every method defaults to
/// doing nothing.
pub trait RunObserver: Send + Sync {
    fn stage_started(&self, _stage: Stage) {}

    fn chunks_embedded(&self, _chunks: usize, _embedded: usize) {}

    fn index_failed(&self, _id: &str, _error: &BenchError) {}

    fn questions_generated(&self, _requested: usize, _generated: usize) {}

    fn search_failed(&self, _question: &str, _error: &BenchError) {}

    fn question_skipped(&self, _question: &str, _reason: &SkipReason) {}

    fn record_produced(&self, _position: usize, _record: &ResultRecord) {}

    fn run_finished(&self, _records: usize, _indexed: usize) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn stage_started(&self, stage: Stage) {
        debug!("Stage: {}", stage);
    }

    fn chunks_embedded(&self, chunks: usize, embedded: usize) {
        if embedded < chunks {
            warn!(
                "Embedded {} of {} chunks; {} dropped",
                embedded,
                chunks,
                chunks - embedded
            );
        } else {
            info!("Embedded {} chunks", chunks);
        }
    }

    fn index_failed(&self, id: &str, error: &BenchError) {
        warn!("Error adding {} to vector store: {}", id, error);
    }

    fn questions_generated(&self, requested: usize, generated: usize) {
        info!("Generated {} of {} requested questions", generated, requested);
    }

    fn search_failed(&self, question: &str, error: &BenchError) {
        warn!("Retrieval failed for question {:?}: {}", question, error);
    }

    fn question_skipped(&self, question: &str, reason: &SkipReason) {
        warn!("Skipping question {:?}: {}", question, reason);
    }

    fn record_produced(&self, position: usize, record: &ResultRecord) {
        debug!(
            "Question {} scored {:.3}: {:?}",
            position + 1,
            record.score,
            record.question
        );
    }

    fn run_finished(&self, records: usize, indexed: usize) {
        info!(
            "Run finished: {} result records over {} indexed chunks",
            records, indexed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::EmbedChunks.to_string(), "embed-chunks");
        assert_eq!(Stage::GenerateQuestions.to_string(), "generate-questions");
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(
            SkipReason::EvaluationFailed("boom".to_string()).to_string(),
            "evaluation failed: boom"
        );
    }
}
