//! Local embedding model using candle + sentence-transformers.

use super::{Embedder, Embedding, embed_in_batches};
use crate::error::BenchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use tokenizers::Tokenizer;
use std::sync::Arc;
use tracing::info;

const DEFAULT_BATCH_SIZE: usize = 32;

struct LocalModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Embedder backed by a BERT-style model running on the CPU.
///
/// Inputs are embedded in sub-batches of `batch_size`, each on a blocking
/// thread so the forward pass never stalls the async runtime.
pub struct CandleEmbedder {
    model: Arc<LocalModel>,
    batch_size: usize,
}

impl CandleEmbedder {
    /// Load the all-MiniLM-L6-v2 model from Hugging Face Hub.
    pub fn load_minilm() -> Result<Self> {
        Self::load("sentence-transformers/all-MiniLM-L6-v2")
    }

    /// Load a sentence-transformers model by name.
    pub fn load(model_id: &str) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("Failed to create HF Hub API")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .context("Failed to get config.json")?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .context("Failed to get tokenizer.json")?;
        let weights_path = repo
            .get("model.safetensors")
            .context("Failed to get model weights")?;

        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .context("Failed to parse config")?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .context("Failed to load model weights")?
        };

        let model = BertModel::load(vb, &config).context("Failed to load BERT model")?;
        info!("Loaded local embedding model {}", model_id);

        Ok(Self {
            model: Arc::new(LocalModel {
                model,
                tokenizer,
                device,
            }),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Maximum number of texts per forward pass.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl LocalModel {
    /// Mean-pooled, L2-normalised embeddings for a batch of texts.
    fn forward(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids_vec = Vec::new();
        let mut attention_mask_vec = Vec::new();

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut mask = encoding.get_attention_mask().to_vec();
            ids.resize(max_len, 0);
            mask.resize(max_len, 0);
            input_ids_vec.extend(ids);
            attention_mask_vec.extend(mask);
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids_vec, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_mask_vec, (batch_size, max_len), &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let mask = attention_mask
            .unsqueeze(2)?
            .to_dtype(output.dtype())?
            .broadcast_as(output.shape())?;

        let summed = (output * &mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        let pooled = (summed / counts)?;

        let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
        let normalized = pooled.broadcast_div(&norms)?;

        Ok(normalized.to_vec2::<f32>()?)
    }
}

#[async_trait]
impl Embedder for CandleEmbedder {
    async fn embed(&self, text: &str) -> Option<Embedding> {
        self.embed_batch(&[text.to_string()]).await.pop().flatten()
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Embedding>> {
        embed_in_batches(texts, self.batch_size, |batch| {
            let model = Arc::clone(&self.model);
            async move {
                tokio::task::spawn_blocking(move || model.forward(&batch))
                    .await
                    .map_err(|e| BenchError::Embedding(e.to_string()))?
                    .map_err(|e| BenchError::Embedding(e.to_string()))
            }
        })
        .await
    }
}
