//! Answer scoring.

mod judge;

pub use judge::LlmJudgeEvaluator;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// Scores a generated answer against a reference answer.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// A score in `[0, 1]`, higher is better.
    async fn evaluate(&self, generated: &str, reference: &str) -> Result<f64>;
}

/// Bag-of-words F1 over lower-cased, whitespace-separated token sets.
///
/// Two empty answers score 1.0; exactly one empty answer scores 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct F1Evaluator;

impl F1Evaluator {
    pub fn score(generated: &str, reference: &str) -> f64 {
        let generated = token_set(generated);
        let reference = token_set(reference);

        match (generated.is_empty(), reference.is_empty()) {
            (true, true) => return 1.0,
            (true, false) | (false, true) => return 0.0,
            (false, false) => {}
        }

        let common = generated.intersection(&reference).count();
        2.0 * common as f64 / (generated.len() + reference.len()) as f64
    }
}

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

#[async_trait]
impl Evaluator for F1Evaluator {
    async fn evaluate(&self, generated: &str, reference: &str) -> Result<f64> {
        Ok(Self::score(generated, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ANSWER: &str = "The fox jumps over the lazy dog.";

    #[tokio::test]
    async fn test_identical_answers_score_one() {
        let score = F1Evaluator.evaluate(SAMPLE_ANSWER, SAMPLE_ANSWER).await.unwrap();
        assert_eq!(score, 1.0);
    }

    #[tokio::test]
    async fn test_partial_overlap_scores_between() {
        let score = F1Evaluator.evaluate("The fox jumps", SAMPLE_ANSWER).await.unwrap();
        assert!(score > 0.0 && score < 1.0);
        // {the, fox, jumps} vs {the, fox, jumps, over, lazy, dog.}
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_answers_score_zero() {
        assert_eq!(F1Evaluator::score("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(F1Evaluator::score("THE FOX", "the fox"), 1.0);
    }

    #[test]
    fn test_empty_answers() {
        assert_eq!(F1Evaluator::score("", ""), 1.0);
        assert_eq!(F1Evaluator::score("   ", ""), 1.0);
        assert_eq!(F1Evaluator::score("", "something"), 0.0);
        assert_eq!(F1Evaluator::score("something", ""), 0.0);
    }

    #[test]
    fn test_symmetric_on_swap() {
        let a = "the fox jumps high";
        let b = "a fox jumps";
        assert_eq!(F1Evaluator::score(a, b), F1Evaluator::score(b, a));
    }
}
