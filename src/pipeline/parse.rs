//! Response parsing: free-form model output → ordered [`QaPair`] records.
//!
//! Models follow the prompted `Question N:` / `Answer N:` template loosely.
//! They may put the text on the marker line or on the next line, wrap long
//! answers over several lines, and switch marker language regardless of what
//! was requested. The parser is a line-oriented finite-state machine that
//! tolerates all of these and never fails: text it cannot place is dropped,
//! and a response without any marker simply yields no pairs.
//!
//! ## Marker matching
//!
//! Markers are literal, case-sensitive prefixes of the trimmed line. All five
//! languages are active at once. Question markers are tested before answer
//! markers, so `Réponse`, which appears in both lists, opens a question.
//!
//! ## States
//!
//! ```text
//!                 question marker (no inline text)
//!   Idle ───────────────────────────────▶ AwaitingQuestionText
//!    │ question marker + text                 │ any line
//!    ▼                                        ▼
//!   AccumulatingAnswer ◀──── any line ──── AwaitingAnswerText
//!    │   ▲ continuation lines                 ▲
//!    └───┴── answer marker (no inline text) ──┘
//! ```
//!
//! A question marker always flushes the pair in progress first.

use crate::output::QaPair;
use tracing::debug;

/// Line prefixes that open a question, in match order.
pub const QUESTION_MARKERS: [&str; 5] = ["Domanda", "Question", "Frage", "Pregunta", "Réponse"];

/// Line prefixes that open an answer, in match order.
pub const ANSWER_MARKERS: [&str; 5] = ["Risposta", "Answer", "Antwort", "Respuesta", "Réponse"];

/// What a single trimmed, non-blank line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Question marker, with the trimmed text after the first `:` if any.
    Question(Option<&'a str>),
    /// Answer marker, with the trimmed text after the first `:` if any.
    Answer(Option<&'a str>),
    Text,
}

/// Classify a trimmed line. Question markers win over answer markers.
pub fn classify_line(line: &str) -> LineKind<'_> {
    if QUESTION_MARKERS.iter().any(|m| line.starts_with(m)) {
        LineKind::Question(inline_text(line))
    } else if ANSWER_MARKERS.iter().any(|m| line.starts_with(m)) {
        LineKind::Answer(inline_text(line))
    } else {
        LineKind::Text
    }
}

/// Text after the first `:` of a marker line, if non-empty once trimmed.
fn inline_text(line: &str) -> Option<&str> {
    line.split_once(':')
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
}

/// Parser state between lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParserState {
    /// No question held. Stray text and answers are ignored here.
    #[default]
    Idle,
    /// A question marker had no inline text; the next line is the question.
    AwaitingQuestionText,
    /// An answer marker had no inline text; the next line starts the answer.
    AwaitingAnswerText { question: String },
    /// A question is held and answer text (possibly none yet) accumulates.
    AccumulatingAnswer { question: String, answer: String },
}

/// Incremental parser; feed lines with [`QaParser::push_line`].
#[derive(Debug, Default)]
pub struct QaParser {
    state: ParserState,
    pairs: Vec<QaPair>,
}

impl QaParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Pairs flushed so far (not including the one in progress).
    pub fn pairs(&self) -> &[QaPair] {
        &self.pairs
    }

    /// Advance the state machine by one raw line. Blank lines are skipped.
    pub fn push_line(&mut self, raw: &str) {
        let line = raw.trim();
        if line.is_empty() {
            return;
        }

        let state = std::mem::take(&mut self.state);
        let kind = classify_line(line);

        self.state = match (state, kind) {
            (state, LineKind::Question(inline)) => {
                self.flush(state);
                match inline {
                    Some(question) => ParserState::AccumulatingAnswer {
                        question: question.to_string(),
                        answer: String::new(),
                    },
                    None => ParserState::AwaitingQuestionText,
                }
            }

            // Whatever follows a bare question marker is the question, even
            // a line that looks like an answer marker.
            (ParserState::AwaitingQuestionText, _) => ParserState::AccumulatingAnswer {
                question: line.to_string(),
                answer: String::new(),
            },

            (ParserState::Idle, _) => ParserState::Idle,

            (ParserState::AwaitingAnswerText { question }, LineKind::Answer(inline)) => {
                Self::answer_marker(question, inline)
            }

            (ParserState::AccumulatingAnswer { question, answer }, LineKind::Answer(inline)) => {
                // A second answer marker before any new question: keep the
                // first answer as its own pair, the question stays current.
                if !answer.is_empty() {
                    self.pairs.push(QaPair::new(question.clone(), answer.trim()));
                }
                Self::answer_marker(question, inline)
            }

            (ParserState::AwaitingAnswerText { question }, LineKind::Text) => {
                ParserState::AccumulatingAnswer {
                    question,
                    answer: line.to_string(),
                }
            }

            (ParserState::AccumulatingAnswer { question, mut answer }, LineKind::Text) => {
                if !answer.is_empty() {
                    answer.push(' ');
                }
                answer.push_str(line);
                ParserState::AccumulatingAnswer { question, answer }
            }
        };
    }

    fn answer_marker(question: String, inline: Option<&str>) -> ParserState {
        match inline {
            Some(answer) => ParserState::AccumulatingAnswer {
                question,
                answer: answer.to_string(),
            },
            None => ParserState::AwaitingAnswerText { question },
        }
    }

    /// Emit the held question, if any, with its trimmed answer.
    fn flush(&mut self, state: ParserState) {
        match state {
            ParserState::AwaitingAnswerText { question } => {
                self.pairs.push(QaPair::new(question, String::new()));
            }
            ParserState::AccumulatingAnswer { question, answer } => {
                self.pairs.push(QaPair::new(question, answer.trim()));
            }
            ParserState::Idle | ParserState::AwaitingQuestionText => {}
        }
    }

    /// Flush the pair in progress and return every pair in order.
    pub fn finish(mut self) -> Vec<QaPair> {
        let state = std::mem::take(&mut self.state);
        self.flush(state);
        self.pairs
    }
}

/// Parse one generation response into question/answer pairs.
pub fn parse_qa_response(response: &str) -> Vec<QaPair> {
    let mut parser = QaParser::new();
    for line in response.split('\n') {
        parser.push_line(line);
    }
    let pairs = parser.finish();
    debug!("Parsed {} Q&A pairs from {} bytes", pairs.len(), response.len());
    pairs
}

/// Remove Markdown emphasis asterisks so `**Question 1:**` parses as a marker.
pub fn strip_emphasis(response: &str) -> String {
    response.replace('*', "")
}
