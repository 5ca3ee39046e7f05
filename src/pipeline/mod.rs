//! Pipeline stages for PDF-to-Q&A generation.
//!
//! ```text
//! input ──▶ extract ──▶ chunk ──▶ llm ──▶ parse ──▶ render
//! (URL/path)  (pdfium)  (paragraphs) (retry)  (FSM)   (md/pdf)
//! ```
//!
//! 1. [`input`]   canonicalise the user-supplied path or URL to a local file
//! 2. [`extract`] page text via pdfium, in `spawn_blocking`
//! 3. [`chunk`]   pack paragraphs into bounded chunks
//! 4. [`llm`]     one generation call per chunk, retried on rate limits
//! 5. [`parse`]   rebuild question/answer pairs from the response text
//! 6. [`render`]  write the pairs as Markdown or PDF
//!
//! `chunk` and `parse` are pure and synchronous.

pub mod chunk;
pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod render;
