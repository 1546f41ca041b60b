//! Benchmark report types.

use crate::document::Metadata;
use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One question's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question: String,
    /// Answer produced from the retrieved context.
    pub generated_answer: String,
    /// Answer produced from the full document.
    pub reference_answer: String,
    /// Evaluator score in `[0, 1]`.
    pub score: f64,
}

/// Facts about the run itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Items in the vector index after indexing.
    pub num_chunks: usize,
    /// Questions returned by the question generator.
    pub num_questions: usize,
    /// Metadata of the benchmarked document, as reported by its source.
    #[serde(default)]
    pub document: Metadata,
}

/// Input text, per-question records and run metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub input_content: String,
    pub results: Vec<ResultRecord>,
    pub metadata: RunMetadata,
}

impl RunReport {
    /// Mean score over all records, `None` when there are none.
    pub fn mean_score(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        Some(self.results.iter().map(|r| r.score).sum::<f64>() / self.results.len() as f64)
    }

    /// Plain-text summary for terminal output.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str("========== Benchmark Results ==========\n");
        if let Some(title) = self.document_title() {
            out.push_str(&format!("Document:         {}\n", title));
        }
        out.push_str(&format!("Indexed chunks:   {}\n", self.metadata.num_chunks));
        out.push_str(&format!("Questions:        {}\n", self.metadata.num_questions));
        out.push_str(&format!("Scored questions: {}\n", self.results.len()));
        match self.mean_score() {
            Some(mean) => out.push_str(&format!("Mean score:       {:.3}\n", mean)),
            None => out.push_str("Mean score:       n/a\n"),
        }
        out.push_str("---------------------------------------\n");
        for (i, record) in self.results.iter().enumerate() {
            out.push_str(&format!("{:>2}. [{:.3}] {}\n", i + 1, record.score, record.question));
        }
        out.push_str("=======================================\n");
        out
    }

    /// The document's title or name, when its source reported one.
    pub fn document_title(&self) -> Option<&str> {
        ["Title", "name"]
            .iter()
            .find_map(|key| self.metadata.document.get(*key))
            .and_then(|value| value.as_str())
            .filter(|title| !title.is_empty())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| BenchError::Serialization(e.to_string()))
    }

    /// Write the report as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BenchError::io(parent, e))?;
            }
        }

        fs::write(path, self.to_json()?).map_err(|e| BenchError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(question: &str, score: f64) -> ResultRecord {
        ResultRecord {
            question: question.to_string(),
            generated_answer: "generated".to_string(),
            reference_answer: "reference".to_string(),
            score,
        }
    }

    fn report(results: Vec<ResultRecord>) -> RunReport {
        RunReport {
            input_content: "content".to_string(),
            metadata: RunMetadata {
                num_chunks: 4,
                num_questions: results.len(),
                document: Metadata::new(),
            },
            results,
        }
    }

    #[test]
    fn test_mean_score() {
        let scored = report(vec![record("a", 0.5), record("b", 1.0)]);
        assert!((scored.mean_score().unwrap() - 0.75).abs() < 1e-9);
        assert!(report(Vec::new()).mean_score().is_none());
    }

    #[test]
    fn test_summary_lists_questions() {
        let summary = report(vec![record("What does the fox do?", 0.25)]).summary();
        assert!(summary.contains("Indexed chunks:   4"));
        assert!(summary.contains("[0.250] What does the fox do?"));
    }

    #[test]
    fn test_summary_names_the_document() {
        let mut titled = report(Vec::new());
        titled
            .metadata
            .document
            .insert("Title".to_string(), "Fox Facts".into());
        assert_eq!(titled.document_title(), Some("Fox Facts"));
        assert!(titled.summary().contains("Document:         Fox Facts"));
        assert!(report(Vec::new()).document_title().is_none());
    }

    #[test]
    fn test_json_shape() {
        let json = report(vec![record("q", 1.0)]).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["input_content"], "content");
        assert_eq!(value["metadata"]["num_chunks"], 4);
        assert_eq!(value["results"][0]["question"], "q");
        assert_eq!(value["results"][0]["reference_answer"], "reference");
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("report.json");

        report(vec![record("q", 0.5)]).save(&path).unwrap();

        let loaded: RunReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.results, vec![record("q", 0.5)]);
    }
}
