//! # edgequake-pdf2qa
//!
//! Turn the text of a PDF into exam-style question/answer pairs with an LLM,
//! then render them as a PDF or Markdown document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (spawn_blocking)
//!  ├─ 3. Chunk     paragraph-preserving chunks of ≤ max_chunk_length chars
//!  ├─ 4. Generate  one LLM call per chunk, in order, retried on 429
//!  ├─ 5. Parse     "Question N:" / "Answer N:" markers → QaPair
//!  └─ 6. Render    localised Markdown or A4 PDF
//! ```
//!
//! The parser understands English, Italian, French, Spanish and German
//! markers regardless of the language requested for the output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2qa::{generate, GenerationConfig, OutputLanguage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = GenerationConfig::builder()
//!         .language(OutputLanguage::English)
//!         .build()?;
//!     let output = generate("lecture.pdf", &config).await?;
//!     for pair in &output.pairs {
//!         println!("Q: {}\nA: {}\n", pair.question, pair.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfqa` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, OutputFormat, OutputLanguage};
pub use error::{GenerationError, QaGenError};
pub use generate::{
    generate, generate_from_bytes, generate_from_text, generate_sync, generate_to_file,
    generate_with_cancel, inspect, write_output,
};
pub use job::{CancelToken, JobEvent, JobHandle, QaJob};
pub use output::{ChunkResult, DocumentMetadata, GenerationStats, QaOutput, QaPair};
pub use pipeline::chunk::{chunk_text, TextChunk};
pub use pipeline::llm::{LlmGenerator, QaGenerator};
pub use pipeline::parse::{parse_qa_response, QaParser};
pub use pipeline::render::{render_markdown, render_pdf, write_document};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
