//! Generation calls: prompt in, raw response text out.
//!
//! The pipeline talks to the model through the [`QaGenerator`] trait so the
//! chunk loop can be driven by any `edgequake-llm` provider in production and
//! by a scripted generator in tests. Prompt wording lives in
//! [`crate::prompts`]; this module only owns the call and its retry policy.
//!
//! ## Retry Strategy
//!
//! Only rate limiting (HTTP 429 and provider equivalents) is retried. The
//! wait grows linearly, `retry_backoff_ms * attempt`, so with the defaults a
//! quota hiccup costs 1 s, then 2 s, then 3 s. Any other failure (bad key,
//! malformed request, server error) aborts the run on the spot: generated
//! pairs are only useful in document order, so skipping a chunk silently
//! would leave a hole nobody notices.

use crate::config::GenerationConfig;
use crate::error::{GenerationError, QaGenError};
use crate::prompts::SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Something that turns a prompt into response text.
#[async_trait]
pub trait QaGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Name used in log lines.
    fn name(&self) -> &str {
        "generator"
    }
}

/// [`QaGenerator`] backed by an `edgequake-llm` provider.
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl QaGenerator for LlmGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| GenerationError::from_provider_message(e.to_string()))?;

        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

/// Build `CompletionOptions` from the generation config.
fn build_options(config: &GenerationConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Call the generator, retrying rate-limited attempts.
///
/// Returns the response text and the number of retries it took.
///
/// # Errors
/// * [`QaGenError::RateLimitExceeded`] — still rate limited after
///   `config.max_retries` retries.
/// * [`QaGenError::LlmApiError`] — any other failure, on the first occurrence.
pub async fn generate_with_retry(
    generator: &dyn QaGenerator,
    prompt: &str,
    chunk_num: usize,
    config: &GenerationConfig,
) -> Result<(String, u32), QaGenError> {
    let mut attempt: u32 = 0;

    loop {
        let err = match generator.generate(prompt).await {
            Ok(text) => return Ok((text, attempt)),
            Err(err) => err,
        };

        match err {
            GenerationError::RateLimited(detail) if attempt < config.max_retries => {
                attempt += 1;
                let wait_ms = config.retry_backoff_ms * u64::from(attempt);
                warn!(
                    "Chunk {}: rate limited by {}, retry {}/{} in {}ms",
                    chunk_num,
                    generator.name(),
                    attempt,
                    config.max_retries,
                    wait_ms
                );
                debug!("Chunk {}: {}", chunk_num, detail);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_chunk_retry(chunk_num, attempt, wait_ms);
                }
                sleep(Duration::from_millis(wait_ms)).await;
            }
            GenerationError::RateLimited(detail) => {
                return Err(QaGenError::RateLimitExceeded {
                    chunk: chunk_num,
                    retries: config.max_retries,
                    detail,
                });
            }
            GenerationError::Failed(message) => {
                return Err(QaGenError::LlmApiError {
                    chunk: chunk_num,
                    message,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl QaGenerator for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Failed("script exhausted".into())))
        }
    }

    fn fast_config(max_retries: u32) -> GenerationConfig {
        GenerationConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    fn limited() -> Result<String, GenerationError> {
        Err(GenerationError::RateLimited("429".into()))
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&GenerationConfig::default());
        assert_eq!(opts.temperature, Some(0.7));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[test]
    fn first_attempt_success_reports_zero_retries() {
        let gen = Scripted::new(vec![Ok("Question 1: Q?".into())]);
        let (text, retries) =
            tokio_test::block_on(generate_with_retry(&gen, "p", 1, &fast_config(3))).unwrap();
        assert_eq!(text, "Question 1: Q?");
        assert_eq!(retries, 0);
    }

    #[tokio::test]
    async fn rate_limited_calls_are_retried() {
        let gen = Scripted::new(vec![limited(), limited(), Ok("done".into())]);
        let (text, retries) = generate_with_retry(&gen, "p", 2, &fast_config(3))
            .await
            .unwrap();
        assert_eq!(text, "done");
        assert_eq!(retries, 2);
        assert_eq!(gen.calls(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_fail_with_rate_limit_error() {
        let gen = Scripted::new(vec![limited(), limited(), limited()]);
        let err = generate_with_retry(&gen, "p", 5, &fast_config(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QaGenError::RateLimitExceeded { chunk: 5, retries: 2, .. }
        ));
        assert_eq!(gen.calls(), 3);
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let gen = Scripted::new(vec![
            Err(GenerationError::Failed("401 invalid key".into())),
            Ok("never reached".into()),
        ]);
        let err = generate_with_retry(&gen, "p", 1, &fast_config(3))
            .await
            .unwrap_err();
        assert!(matches!(err, QaGenError::LlmApiError { chunk: 1, .. }));
        assert_eq!(gen.calls(), 1);
    }
}
