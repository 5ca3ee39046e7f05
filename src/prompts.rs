//! Prompt templates for question/answer generation.
//!
//! The template asks for numbered `Question N:` / `Answer N:` markers;
//! [`crate::pipeline::parse`] relies on that shape, so changes to the
//! marker wording here must be mirrored there.

use crate::config::OutputLanguage;

/// System message sent ahead of every chunk prompt.
pub const SYSTEM_PROMPT: &str = "You are a university professor preparing an oral exam. \
You write precise questions about the material you are given and answer them accurately \
using only that material.";

/// Build the user prompt for one chunk.
///
/// The marker words stay in English even when another language is
/// requested; models translate them inconsistently, and the parser accepts
/// every supported language either way.
pub fn build_prompt(chunk: &str, language: OutputLanguage, questions: usize) -> String {
    format!(
        "Analyze the following text and generate {questions} possible questions that a professor might ask,\n\
along with their answers {directive}.\n\
Format the questions and answers clearly (Question 1:, Answer 1:, etc).\n\
\n\
Text to analyze:\n\
{chunk}\n",
        directive = language.prompt_directive(),
    )
}
