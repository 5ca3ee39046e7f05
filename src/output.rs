//! Result records produced by a generation run.
//!
//! [`QaPair`] is the unit the parser emits and the renderer consumes.
//! Everything else here is bookkeeping returned alongside the pairs so
//! callers can report per-chunk timings or serialise the whole run as JSON.

use crate::config::OutputLanguage;
use serde::{Deserialize, Serialize};

/// One question/answer record extracted from a generation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    /// May be empty when the response ended before any answer text.
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    pub fn has_answer(&self) -> bool {
        !self.answer.is_empty()
    }
}

/// Outcome of one chunk's generate-and-parse step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    /// 0-indexed position of the chunk in the document.
    pub chunk_index: usize,
    /// Character count of the chunk text sent to the model.
    pub chunk_chars: usize,
    /// Pairs parsed from this chunk's response, in order of appearance.
    pub pairs: Vec<QaPair>,
    /// Byte length of the raw response text.
    pub raw_response_len: usize,
    /// Rate-limit retries needed before the call succeeded.
    pub retries: u32,
    pub duration_ms: u64,
}

/// Document-level metadata read by pdfium.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Aggregate statistics for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub total_chunks: usize,
    pub processed_chunks: usize,
    pub total_pairs: usize,
    /// Characters of extracted text fed to the chunker.
    pub total_chars: usize,
    pub extract_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
    /// True when the run was stopped between chunks; `pairs` is then partial.
    pub cancelled: bool,
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaOutput {
    /// All pairs in chunk order, then order of appearance.
    pub pairs: Vec<QaPair>,
    pub chunks: Vec<ChunkResult>,
    pub metadata: Option<DocumentMetadata>,
    pub stats: GenerationStats,
    pub language: OutputLanguage,
}

impl QaOutput {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qa_pair_serialises_with_plain_field_names() {
        let pair = QaPair::new("What is X?", "X is Y.");
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"question":"What is X?","answer":"X is Y."}"#);
    }

    #[test]
    fn empty_answer_is_reported() {
        assert!(!QaPair::new("Q?", "").has_answer());
        assert!(QaPair::new("Q?", "A.").has_answer());
    }
}
