//! Configuration types for question/answer generation.
//!
//! All run behaviour is controlled through [`GenerationConfig`], built via
//! its [`GenerationConfigBuilder`]. One struct holds every knob so a config
//! can be cloned into a background job, logged, or compared between runs.

use crate::error::QaGenError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Default maximum chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_LENGTH: usize = 4000;

/// Default number of questions requested per chunk.
pub const DEFAULT_QUESTIONS_PER_CHUNK: usize = 2;

/// Configuration for a PDF-to-Q&A run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2qa::{GenerationConfig, OutputLanguage};
///
/// let config = GenerationConfig::builder()
///     .language(OutputLanguage::English)
///     .max_chunk_length(3000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_chunk_length, 3000);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Upper bound on the characters of one chunk. Default: 4000.
    ///
    /// Soft limit: a single paragraph longer than this becomes its own
    /// oversized chunk instead of being cut mid-sentence.
    pub max_chunk_length: usize,

    /// Language the questions and answers are requested in. Also selects the
    /// output document title. Default: Italian.
    pub language: OutputLanguage,

    /// Questions requested per chunk. Default: 2.
    pub questions_per_chunk: usize,

    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Question writing benefits from some variety, unlike transcription.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per chunk. Default: 2048.
    pub max_tokens: usize,

    /// Retries allowed for a rate-limited call. Default: 3.
    ///
    /// Only HTTP 429 style failures are retried; any other error aborts the
    /// run immediately.
    pub max_retries: u32,

    /// Base retry delay in milliseconds. Default: 1000.
    ///
    /// The wait grows linearly: 1 s → 2 s → 3 s.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Remove `*` emphasis markers from responses before parsing. Default: true.
    pub strip_emphasis: bool,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_chunk_length: DEFAULT_MAX_CHUNK_LENGTH,
            language: OutputLanguage::default(),
            questions_per_chunk: DEFAULT_QUESTIONS_PER_CHUNK,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 1000,
            password: None,
            strip_emphasis: true,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("max_chunk_length", &self.max_chunk_length)
            .field("language", &self.language)
            .field("questions_per_chunk", &self.questions_per_chunk)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("strip_emphasis", &self.strip_emphasis)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// Fail fast on settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), QaGenError> {
        if self.max_chunk_length == 0 {
            return Err(QaGenError::InvalidConfig(
                "max_chunk_length must be ≥ 1".into(),
            ));
        }
        if self.questions_per_chunk == 0 {
            return Err(QaGenError::InvalidConfig(
                "questions_per_chunk must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn max_chunk_length(mut self, n: usize) -> Self {
        self.config.max_chunk_length = n;
        self
    }

    pub fn language(mut self, language: OutputLanguage) -> Self {
        self.config.language = language;
        self
    }

    pub fn questions_per_chunk(mut self, n: usize) -> Self {
        self.config.questions_per_chunk = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn strip_emphasis(mut self, v: bool) -> Self {
        self.config.strip_emphasis = v;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, QaGenError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Language the questions are written in and the document title uses.
///
/// The parser recognises every language's markers regardless of this
/// setting; models do not always answer in the requested language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputLanguage {
    English,
    #[default]
    Italian,
    French,
    Spanish,
    German,
}

impl OutputLanguage {
    pub const ALL: [OutputLanguage; 5] = [
        OutputLanguage::English,
        OutputLanguage::Italian,
        OutputLanguage::French,
        OutputLanguage::Spanish,
        OutputLanguage::German,
    ];

    /// Phrase appended to the prompt to request this language.
    pub fn prompt_directive(self) -> &'static str {
        match self {
            OutputLanguage::English => "in English",
            OutputLanguage::Italian => "in italiano",
            OutputLanguage::French => "en français",
            OutputLanguage::Spanish => "en español",
            OutputLanguage::German => "auf Deutsch",
        }
    }

    /// Localised title of the output document.
    pub fn title(self) -> &'static str {
        match self {
            OutputLanguage::English => "Questions and Answers",
            OutputLanguage::Italian => "Domande e Risposte",
            OutputLanguage::French => "Questions et Réponses",
            OutputLanguage::Spanish => "Preguntas y Respuestas",
            OutputLanguage::German => "Fragen und Antworten",
        }
    }

    /// Name of the language in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            OutputLanguage::English => "English",
            OutputLanguage::Italian => "Italiano",
            OutputLanguage::French => "Français",
            OutputLanguage::Spanish => "Español",
            OutputLanguage::German => "Deutsch",
        }
    }
}

impl fmt::Display for OutputLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.native_name())
    }
}

impl FromStr for OutputLanguage {
    type Err = QaGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(OutputLanguage::English),
            "it" | "italian" | "italiano" => Ok(OutputLanguage::Italian),
            "fr" | "french" | "français" | "francais" => Ok(OutputLanguage::French),
            "es" | "spanish" | "español" | "espanol" => Ok(OutputLanguage::Spanish),
            "de" | "german" | "deutsch" => Ok(OutputLanguage::German),
            other => Err(QaGenError::InvalidConfig(format!(
                "Unsupported language '{other}'. Use one of: en, it, fr, es, de"
            ))),
        }
    }
}

/// File format of the rendered question/answer document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Paginated A4 PDF. (default)
    #[default]
    Pdf,
    /// Markdown, one numbered heading per question.
    Markdown,
}

impl OutputFormat {
    /// Infer the format from a file extension; unknown extensions give PDF.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => OutputFormat::Markdown,
            _ => OutputFormat::Pdf,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "md",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.max_chunk_length, 4000);
        assert_eq!(c.questions_per_chunk, 2);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.language, OutputLanguage::Italian);
        assert!(c.strip_emphasis);
    }

    #[test]
    fn zero_chunk_length_is_rejected() {
        let err = GenerationConfig::builder()
            .max_chunk_length(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, QaGenError::InvalidConfig(_)));
    }

    #[test]
    fn zero_questions_is_rejected() {
        assert!(GenerationConfig::builder()
            .questions_per_chunk(0)
            .build()
            .is_err());
    }

    #[test]
    fn temperature_is_clamped() {
        let c = GenerationConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn language_parses_names_and_codes() {
        assert_eq!("English".parse::<OutputLanguage>().unwrap(), OutputLanguage::English);
        assert_eq!("Italiano".parse::<OutputLanguage>().unwrap(), OutputLanguage::Italian);
        assert_eq!("Français".parse::<OutputLanguage>().unwrap(), OutputLanguage::French);
        assert_eq!("es".parse::<OutputLanguage>().unwrap(), OutputLanguage::Spanish);
        assert_eq!(" DEUTSCH ".parse::<OutputLanguage>().unwrap(), OutputLanguage::German);
        assert!("klingon".parse::<OutputLanguage>().is_err());
    }

    #[test]
    fn titles_are_localised() {
        assert_eq!(OutputLanguage::English.title(), "Questions and Answers");
        assert_eq!(OutputLanguage::Italian.title(), "Domande e Risposte");
        assert_eq!(OutputLanguage::French.title(), "Questions et Réponses");
        assert_eq!(OutputLanguage::Spanish.title(), "Preguntas y Respuestas");
        assert_eq!(OutputLanguage::German.title(), "Fragen und Antworten");
        assert_eq!(OutputLanguage::default().title(), "Domande e Risposte");
    }

    #[test]
    fn format_inferred_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("out.md")), OutputFormat::Markdown);
        assert_eq!(OutputFormat::from_path(Path::new("out.PDF")), OutputFormat::Pdf);
        assert_eq!(OutputFormat::from_path(Path::new("out")), OutputFormat::Pdf);
    }
}
