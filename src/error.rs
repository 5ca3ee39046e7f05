//! Error types for the edgequake-pdf2qa library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`QaGenError`] — **Fatal**: the run cannot proceed at all (bad input
//!   file, unreadable PDF, provider not configured, invalid chunk size).
//!   Returned as `Err(QaGenError)` from the top-level `generate*` functions.
//!
//! * [`GenerationError`] — returned by a single generation call. The
//!   `RateLimited` variant is retried by
//!   [`crate::pipeline::llm::generate_with_retry`]; everything else is
//!   promoted to a fatal [`QaGenError`] immediately.
//!
//! A response that contains no recognisable markers is *not* an error at
//! all: the parser yields zero pairs for that chunk and the run continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2qa library.
#[derive(Debug, Error)]
pub enum QaGenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The PDF opened fine but contains no extractable text (e.g. a scan).
    #[error("Unable to extract text from '{path}': the document has no text layer or is empty")]
    EmptyDocument { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The provider kept answering HTTP 429 after every retry.
    #[error("Rate limit still exceeded on chunk {chunk} after {retries} retries: {detail}")]
    RateLimitExceeded {
        chunk: usize,
        retries: u32,
        detail: String,
    },

    /// The LLM API returned a non-retryable error.
    #[error("LLM API error on chunk {chunk}: {message}")]
    LlmApiError { chunk: usize, message: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Every chunk was processed but no question/answer pair was recognised.
    #[error("No questions and answers generated from {chunks} chunk(s)")]
    NoContentGenerated { chunks: usize },

    /// The output document could not be laid out or serialised.
    #[error("Failed to render output document: {0}")]
    RenderFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed, or an invalid chunk size reached the chunker.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The service refused the call because of quota / rate limiting (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other failure; not retried.
    #[error("{0}")]
    Failed(String),
}

impl GenerationError {
    /// Classify a provider error message.
    ///
    /// Providers surface quota errors in different shapes (`429`, `Too Many
    /// Requests`, `rate limit`, `RESOURCE_EXHAUSTED` for Gemini), so the
    /// message is matched case-insensitively.
    pub fn from_provider_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let rate_limited = lower.contains("429")
            || lower.contains("rate limit")
            || lower.contains("ratelimit")
            || lower.contains("too many requests")
            || lower.contains("resource_exhausted")
            || lower.contains("quota");
        if rate_limited {
            GenerationError::RateLimited(message)
        } else {
            GenerationError::Failed(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_exceeded_display() {
        let e = QaGenError::RateLimitExceeded {
            chunk: 4,
            retries: 3,
            detail: "429 Too Many Requests".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("chunk 4"), "got: {msg}");
        assert!(msg.contains("3 retries"), "got: {msg}");
    }

    #[test]
    fn no_content_display() {
        let e = QaGenError::NoContentGenerated { chunks: 7 };
        assert!(e.to_string().contains("7 chunk"));
    }

    #[test]
    fn invalid_config_display() {
        let e = QaGenError::InvalidConfig("max_chunk_length must be ≥ 1".into());
        assert!(e.to_string().starts_with("Invalid configuration"));
    }

    #[test]
    fn classify_quota_errors_as_rate_limited() {
        for msg in [
            "HTTP 429: quota exceeded",
            "Rate limit reached for gpt-4.1-nano",
            "Too Many Requests",
            "RESOURCE_EXHAUSTED",
        ] {
            assert!(
                GenerationError::from_provider_message(msg).is_rate_limited(),
                "expected rate limit for {msg:?}"
            );
        }
    }

    #[test]
    fn classify_other_errors_as_failed() {
        let e = GenerationError::from_provider_message("401 Unauthorized: invalid api key");
        assert_eq!(
            e,
            GenerationError::Failed("401 Unauthorized: invalid api key".into())
        );
    }
}
