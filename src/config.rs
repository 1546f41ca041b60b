//! Configuration for the benchmark.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// LLM configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the LLM API (e.g., "https://api.openai.com")
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name used for question and answer generation
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Embedding provider configuration.
///
/// Empty `api_base`/`api_key` fall back to the LLM settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Maximum inputs per embeddings request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
        }
    }
}

/// Text chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Pipeline settings passed to the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSettings {
    /// Number of questions requested from the question generator.
    pub num_questions: usize,
    /// Retrieval breadth per question.
    pub top_k: usize,
    /// Name of the vector index collection.
    pub collection_name: String,
    /// Questions processed at once.
    pub question_concurrency: usize,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            num_questions: 10,
            top_k: 3,
            collection_name: "benchmark_collection".to_string(),
            question_concurrency: 1,
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM settings
    pub llm: LlmConfig,
    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
    /// Chunker settings
    pub chunking: ChunkingConfig,
    /// Pipeline settings
    pub benchmark: BenchmarkSettings,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    embedding: Option<EmbeddingFileSection>,
    chunking: Option<ChunkingFileSection>,
    benchmark: Option<BenchmarkFileSection>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    batch_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChunkingFileSection {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BenchmarkFileSection {
    num_questions: Option<usize>,
    top_k: Option<usize>,
    collection_name: Option<String>,
    question_concurrency: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (LLM_*, EMBEDDING_*)
    /// 2. Config file (~/.config/docqa-bench/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(api_base) = env::var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        if let Ok(api_key) = env::var("LLM_API_KEY") {
            self.llm.api_key = api_key;
        }

        if let Ok(model) = env::var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(max_tokens) = env::var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        if let Ok(temperature) = env::var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.llm.temperature = temp;
            }
        }

        if let Ok(api_base) = env::var("EMBEDDING_API_BASE") {
            self.embedding.api_base = api_base;
        }

        if let Ok(api_key) = env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = api_key;
        }

        if let Ok(model) = env::var("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(batch_size) = env::var("EMBEDDING_BATCH_SIZE") {
            if let Ok(size) = batch_size.parse() {
                self.embedding.batch_size = size;
            }
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BenchError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| BenchError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(embedding) = file_config.embedding {
            if let Some(api_base) = embedding.api_base {
                config.embedding.api_base = api_base;
            }
            if let Some(api_key) = embedding.api_key {
                config.embedding.api_key = api_key;
            }
            if let Some(model) = embedding.model {
                config.embedding.model = model;
            }
            if let Some(batch_size) = embedding.batch_size {
                config.embedding.batch_size = batch_size;
            }
        }

        if let Some(chunking) = file_config.chunking {
            if let Some(size) = chunking.chunk_size {
                config.chunking.chunk_size = size;
            }
            if let Some(overlap) = chunking.chunk_overlap {
                config.chunking.chunk_overlap = overlap;
            }
        }

        if let Some(bench) = file_config.benchmark {
            if let Some(n) = bench.num_questions {
                config.benchmark.num_questions = n;
            }
            if let Some(k) = bench.top_k {
                config.benchmark.top_k = k;
            }
            if let Some(name) = bench.collection_name {
                config.benchmark.collection_name = name;
            }
            if let Some(concurrency) = bench.question_concurrency {
                config.benchmark.question_concurrency = concurrency;
            }
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "docqa-bench")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Embedding settings with the LLM endpoint filled in where unset.
    pub fn resolved_embedding(&self) -> EmbeddingConfig {
        let mut embedding = self.embedding.clone();
        if embedding.api_base.is_empty() {
            embedding.api_base = self.llm.api_base.clone();
        }
        if embedding.api_key.is_empty() {
            embedding.api_key = self.llm.api_key.clone();
        }
        embedding
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(BenchError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(BenchError::Config(
                "LLM API key is required. Set LLM_API_KEY environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(BenchError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(BenchError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.api_base.is_empty());
        assert!(config.llm.api_key.is_empty());
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.benchmark.num_questions, 10);
        assert_eq!(config.benchmark.top_k, 3);
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlap_not_below_size() {
        let mut config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert!(config.validate().is_ok());

        config.chunking.chunk_overlap = config.chunking.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_llm() {
        let config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        assert_eq!(config.llm.api_base, "https://api.example.com");
        assert_eq!(config.llm.api_key, "test-key");
        assert_eq!(config.llm.model, "gpt-4");
    }

    #[test]
    fn test_embedding_falls_back_to_llm_endpoint() {
        let mut config = Config::with_llm("https://api.example.com", "test-key", "gpt-4");
        let embedding = config.resolved_embedding();
        assert_eq!(embedding.api_base, "https://api.example.com");
        assert_eq!(embedding.api_key, "test-key");

        config.embedding.api_base = "https://embed.example.com".to_string();
        assert_eq!(
            config.resolved_embedding().api_base,
            "https://embed.example.com"
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  api_base: https://llm.example.com
  api_key: secret
chunking:
  chunk_size: 500
  chunk_overlap: 50
benchmark:
  top_k: 5
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.llm.api_base, "https://llm.example.com");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.benchmark.top_k, 5);
        assert_eq!(config.benchmark.num_questions, 10);
    }

    #[test]
    fn test_load_from_file_rejects_bad_yaml() {
        let result = Config::from_yaml("llm: [unclosed");
        assert!(matches!(result, Err(BenchError::Config(_))));
    }
}
