//! OpenAI-compatible embeddings client.

use super::{Embedder, Embedding, embed_in_batches};
use crate::config::EmbeddingConfig;
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Embeddings client for any endpoint that speaks the OpenAI embeddings API.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a new embeddings client.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/v1/embeddings", base)
    }

    /// One embeddings request for `inputs`, re-ordered by response index.
    async fn request(&self, inputs: &[String]) -> Result<Vec<Embedding>> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: inputs,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(BenchError::LlmApi(format!(
                "Embeddings request failed ({}): {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body)?;
        if parsed.data.len() != inputs.len() {
            return Err(BenchError::LlmApi(format!(
                "Embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed.data.sort_by_key(|entry| entry.index);
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        match self.request(&[text.to_string()]).await {
            Ok(mut embeddings) => embeddings.pop(),
            Err(e) => {
                warn!("Embedding failed: {}", e);
                None
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        embed_in_batches(texts, self.config.batch_size, |batch| async move {
            self.request(&batch).await
        })
        .await
    }
}
