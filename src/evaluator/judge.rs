//! LLM-as-judge evaluator.

use super::Evaluator;
use crate::error::{BenchError, Result};
use crate::llm::{LlmClient, Prompts, extract_json};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// Asks a chat model to grade the generated answer against the reference
/// on a 1–5 scale, mapped linearly onto `[0, 1]`.
#[derive(Clone)]
pub struct LlmJudgeEvaluator {
    client: LlmClient,
}

#[derive(Deserialize)]
struct RawJudgement {
    score: f64,
    #[serde(default)]
    explanation: String,
}

impl LlmJudgeEvaluator {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    fn parse_judgement(response: &str) -> Result<f64> {
        let json_str = extract_json(response);

        let raw: RawJudgement = serde_json::from_str(&json_str).map_err(|e| {
            BenchError::Evaluation(format!(
                "Failed to parse judge response: {}. Response: {}",
                e, response
            ))
        })?;

        if !raw.score.is_finite() {
            return Err(BenchError::Evaluation(format!(
                "Judge returned a non-numeric score: {}",
                response
            )));
        }

        debug!("Judge score {}: {}", raw.score, raw.explanation);
        Ok(((raw.score.clamp(1.0, 5.0) - 1.0) / 4.0).clamp(0.0, 1.0))
    }
}

#[async_trait]
impl Evaluator for LlmJudgeEvaluator {
    async fn evaluate(&self, generated: &str, reference: &str) -> Result<f64> {
        match (generated.trim().is_empty(), reference.trim().is_empty()) {
            (true, true) => return Ok(1.0),
            (true, false) | (false, true) => return Ok(0.0),
            _ => {}
        }

        let prompt = Prompts::answer_judge()
            .replace("{reference}", reference)
            .replace("{generated}", generated);

        let response = self
            .client
            .complete(None, &prompt)
            .await
            .map_err(|e| BenchError::Evaluation(e.to_string()))?;

        Self::parse_judgement(&response)
    }
}
