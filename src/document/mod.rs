//! Content sources for the document under test.
//!
//! A [`ContentSource`] supplies the raw text that the benchmark chunks and
//! questions. Sources are read-only: fetching never modifies the resource.

use crate::error::{BenchError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

mod pdf;

pub use pdf::PdfSource;

/// String-keyed metadata attached to documents and indexed items.
pub type Metadata = serde_json::Map<String, Value>;

/// Supplies the text of the document being benchmarked.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the full document text.
    async fn get_content(&self) -> Result<String>;

    /// Fetch descriptive metadata for the document.
    async fn get_metadata(&self) -> Result<Metadata> {
        Ok(Metadata::new())
    }
}

/// A fetched document: text plus metadata, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Fetch content and metadata from a source.
    ///
    /// Only a content failure is an error. Metadata that cannot be read is
    /// logged and left empty.
    pub async fn fetch(source: &dyn ContentSource) -> Result<Self> {
        let content = source.get_content().await?;
        let metadata = match source.get_metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Document metadata unavailable: {}", e);
                Metadata::new()
            }
        };
        Ok(Self { content, metadata })
    }
}

/// Preprocessed text held in memory.
#[derive(Debug, Clone)]
pub struct TextSource {
    content: String,
}

impl TextSource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl ContentSource for TextSource {
    async fn get_content(&self) -> Result<String> {
        Ok(self.content.clone())
    }
}

/// A UTF-8 text file on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContentSource for FileSource {
    async fn get_content(&self) -> Result<String> {
        debug!("Reading document from {}", self.path.display());
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BenchError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn get_metadata(&self) -> Result<Metadata> {
        let meta = tokio::fs::metadata(&self.path).await.map_err(|e| {
            BenchError::SourceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let name = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();

        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), Value::from(name));
        metadata.insert(
            "path".to_string(),
            Value::from(self.path.display().to_string()),
        );
        metadata.insert("size_bytes".to_string(), Value::from(meta.len()));
        Ok(metadata)
    }
}

/// Every `.txt` and `.md` file under a directory, joined in path order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn text_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(BenchError::SourceUnavailable(format!(
                "'{}' is not a directory",
                self.root.display()
            )));
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("txt") | Some("md")
                )
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(BenchError::SourceUnavailable(format!(
                "no text files found under '{}'",
                self.root.display()
            )));
        }

        Ok(files)
    }
}

#[async_trait]
impl ContentSource for DirectorySource {
    async fn get_content(&self) -> Result<String> {
        let files = self.text_files()?;
        let mut parts = Vec::with_capacity(files.len());

        for path in &files {
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                BenchError::SourceUnavailable(format!("{}: {}", path.display(), e))
            })?;
            parts.push(text);
        }

        debug!(
            "Loaded {} files from {}",
            files.len(),
            self.root.display()
        );
        Ok(parts.join("\n\n"))
    }

    async fn get_metadata(&self) -> Result<Metadata> {
        let files = self.text_files()?;
        let mut metadata = Metadata::new();
        metadata.insert(
            "path".to_string(),
            Value::from(self.root.display().to_string()),
        );
        metadata.insert("file_count".to_string(), Value::from(files.len()));
        Ok(metadata)
    }
}
