//! PDF documents.

use super::{ContentSource, Metadata};
use crate::error::{BenchError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A PDF file. Content is the text of every page in page order; metadata is
/// the document information dictionary plus the page count.
#[derive(Debug, Clone)]
pub struct PdfSource {
    path: PathBuf,
}

impl PdfSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, err: impl fmt::Display) -> BenchError {
        BenchError::SourceUnavailable(format!("{}: {}", self.path.display(), err))
    }

    /// Read and parse the file, then run `f` on the parsed document off the
    /// async runtime.
    async fn with_document<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&lopdf::Document) -> std::result::Result<T, lopdf::Error> + Send + 'static,
    {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.unavailable(e))?;

        tokio::task::spawn_blocking(move || {
            let document = lopdf::Document::load_mem(&bytes)?;
            f(&document)
        })
        .await
        .map_err(|e| self.unavailable(e))?
        .map_err(|e| self.unavailable(e))
    }
}

fn page_text(document: &lopdf::Document) -> std::result::Result<String, lopdf::Error> {
    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        text.push_str(&document.extract_text(&[*page_number])?);
    }
    Ok(text)
}

fn info_metadata(document: &lopdf::Document) -> Metadata {
    let mut metadata = Metadata::new();

    let info = match document.trailer.get(b"Info") {
        Ok(lopdf::Object::Reference(id)) => document.get_dictionary(*id).ok(),
        Ok(lopdf::Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    if let Some(info) = info {
        for (key, value) in info.iter() {
            if let Some(value) = info_value(value) {
                metadata.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }
    }

    metadata.insert(
        "page_count".to_string(),
        Value::from(document.get_pages().len()),
    );
    metadata
}

fn info_value(object: &lopdf::Object) -> Option<Value> {
    match object {
        lopdf::Object::String(bytes, _) => Some(Value::from(decode_text_string(bytes))),
        lopdf::Object::Name(name) => Some(Value::from(String::from_utf8_lossy(name).into_owned())),
        lopdf::Object::Integer(i) => Some(Value::from(*i)),
        lopdf::Object::Real(r) => Some(Value::from(f64::from(*r))),
        lopdf::Object::Boolean(b) => Some(Value::from(*b)),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE when they start with a byte order mark.
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xfe, 0xff, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[async_trait]
impl ContentSource for PdfSource {
    async fn get_content(&self) -> Result<String> {
        debug!("Extracting PDF text from {}", self.path.display());
        self.with_document(page_text).await
    }

    async fn get_metadata(&self) -> Result<Metadata> {
        self.with_document(|document| Ok(info_metadata(document))).await
    }
}
