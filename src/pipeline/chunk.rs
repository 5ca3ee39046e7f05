//! Paragraph-preserving text chunking.
//!
//! Extracted PDF text is split on `'\n'` into paragraphs and packed greedily
//! into chunks of at most `max_length` characters. A paragraph is never cut:
//! one that is longer than the limit on its own becomes an oversized chunk.
//! Every paragraph is followed by [`PARAGRAPH_SEPARATOR`] inside the chunk,
//! which keeps the paragraph structure visible to the model and lets
//! [`TextChunk::paragraphs`] recover the source paragraphs exactly.
//!
//! Lengths are counted in `char`s, not bytes, so accented text is not
//! penalised against the limit.

use crate::error::QaGenError;
use serde::{Deserialize, Serialize};

/// Padding appended after every paragraph in a chunk.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

const SEPARATOR_CHARS: usize = PARAGRAPH_SEPARATOR.len();

/// One bounded unit of source text, sent as a single generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// 0-indexed position in the document.
    pub index: usize,
    /// Paragraphs, each followed by [`PARAGRAPH_SEPARATOR`].
    pub text: String,
}

impl TextChunk {
    /// Characters of the chunk without its trailing separator.
    ///
    /// This is the quantity bounded by `max_length`.
    pub fn content_len(&self) -> usize {
        self.content().chars().count()
    }

    /// Total characters including separator padding.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The chunk text without its trailing separator.
    pub fn content(&self) -> &str {
        self.text
            .strip_suffix(PARAGRAPH_SEPARATOR)
            .unwrap_or(&self.text)
    }

    /// The source paragraphs this chunk was built from, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content().split(PARAGRAPH_SEPARATOR)
    }

    /// True for a chunk holding one paragraph that alone exceeds `max_length`.
    pub fn is_oversized(&self, max_length: usize) -> bool {
        self.content_len() > max_length
    }
}

/// Split `text` into ordered chunks of at most `max_length` characters.
///
/// Empty input yields a single chunk containing only the separator, matching
/// the behaviour of the accumulate-then-flush loop. When the very first
/// paragraph already overflows the limit, the still-empty buffer is not
/// emitted.
///
/// # Errors
/// [`QaGenError::InvalidConfig`] when `max_length` is 0.
pub fn chunk_text(text: &str, max_length: usize) -> Result<Vec<TextChunk>, QaGenError> {
    if max_length == 0 {
        return Err(QaGenError::InvalidConfig(
            "chunk max_length must be ≥ 1".into(),
        ));
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for paragraph in text.split('\n') {
        let paragraph_chars = paragraph.chars().count();

        if buffer_chars + paragraph_chars > max_length && !buffer.is_empty() {
            push_chunk(&mut chunks, std::mem::take(&mut buffer));
            buffer_chars = 0;
        }

        buffer.push_str(paragraph);
        buffer.push_str(PARAGRAPH_SEPARATOR);
        buffer_chars += paragraph_chars + SEPARATOR_CHARS;
    }

    if !buffer.is_empty() {
        push_chunk(&mut chunks, buffer);
    }

    Ok(chunks)
}

fn push_chunk(chunks: &mut Vec<TextChunk>, text: String) {
    let index = chunks.len();
    chunks.push(TextChunk { index, text });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("alpha\nbeta", 100).unwrap();
        assert_eq!(texts(&chunks), vec!["alpha\n\nbeta\n\n"]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn paragraphs_are_packed_greedily() {
        // "aaaa" + sep = 6 chars in the buffer; 6 + 4 = 10 fits, 12 + 4 does not.
        let chunks = chunk_text("aaaa\nbbbb\ncccc", 10).unwrap();
        assert_eq!(texts(&chunks), vec!["aaaa\n\nbbbb\n\n", "cccc\n\n"]);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn limit_is_inclusive() {
        let chunks = chunk_text("abcde", 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content_len(), 5);
    }

    #[test]
    fn oversized_paragraph_is_kept_whole() {
        let long = "x".repeat(50);
        let text = format!("short\n{long}\ntail");
        let chunks = chunk_text(&text, 10).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content(), long);
        assert!(chunks[1].is_oversized(10));
        assert!(!chunks[0].is_oversized(10));
    }

    #[test]
    fn oversized_first_paragraph_does_not_emit_empty_chunk() {
        let long = "y".repeat(30);
        let chunks = chunk_text(&long, 10).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content(), long);
    }

    #[test]
    fn empty_input_yields_separator_chunk() {
        let chunks = chunk_text("", 4000).unwrap();
        assert_eq!(texts(&chunks), vec!["\n\n"]);
        assert_eq!(chunks[0].paragraphs().collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn zero_max_length_fails_fast() {
        assert!(matches!(
            chunk_text("anything", 0),
            Err(QaGenError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_paragraphs_round_trip() {
        let text = "one\n\n\ntwo";
        let chunks = chunk_text(text, 4000).unwrap();
        let paragraphs: Vec<&str> = chunks.iter().flat_map(|c| c.paragraphs()).collect();
        assert_eq!(paragraphs, vec!["one", "", "", "two"]);
    }

    #[test]
    fn length_is_counted_in_chars() {
        // 5 chars, 10 bytes.
        let chunks = chunk_text("ééééé", 5).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content_len(), 5);
    }
}
