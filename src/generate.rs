//! Full-document generation entry points.
//!
//! [`generate`] runs the whole pipeline and returns once every chunk has
//! been answered. [`generate_from_text`] is the core chunk loop on its own,
//! usable with any [`QaGenerator`] and already-extracted text. For progress
//! events over a channel and cancellation from another task see
//! [`crate::job::QaJob`].

use crate::config::{GenerationConfig, OutputFormat};
use crate::error::QaGenError;
use crate::job::CancelToken;
use crate::output::{ChunkResult, DocumentMetadata, GenerationStats, QaOutput, QaPair};
use crate::pipeline::llm::{self, LlmGenerator, QaGenerator};
use crate::pipeline::{chunk, extract, input, parse, render};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::borrow::Cow;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Generate question/answer pairs for a PDF file or URL.
///
/// # Errors
/// Input, PDF and provider errors abort before the first chunk. During the
/// loop, an exhausted rate-limit budget or any other provider failure
/// aborts the run; pairs from earlier chunks are discarded with it.
///
/// A document whose responses contain no markers at all is not an error:
/// the returned output is simply empty.
pub async fn generate(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<QaOutput, QaGenError> {
    generate_with_cancel(input_str, config, &CancelToken::new()).await
}

/// [`generate`] with a token that stops the run between chunks.
pub async fn generate_with_cancel(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
    cancel: &CancelToken,
) -> Result<QaOutput, QaGenError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    config.validate()?;
    info!("Starting Q&A generation: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Get/create provider ──────────────────────────────────────
    let provider = resolve_provider(config)?;
    let generator = LlmGenerator::new(provider, config);

    // ── Step 3: Extract text ─────────────────────────────────────────────
    let extract_start = Instant::now();
    let metadata = extract::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let text = extract::extract_text(&pdf_path, config.password.as_deref()).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {} pages in {}ms",
        text.chars().count(),
        metadata.page_count,
        extract_duration_ms
    );

    // ── Step 4: Chunk, generate, parse ───────────────────────────────────
    let mut output = generate_from_text(&text, &generator, config, cancel).await?;

    output.metadata = Some(metadata);
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Generation complete: {} pairs from {}/{} chunks, {}ms total",
        output.stats.total_pairs,
        output.stats.processed_chunks,
        output.stats.total_chunks,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run the chunk loop over already-extracted text.
///
/// Chunks are processed strictly in order: each prompt is sent only after
/// the previous response was parsed and its pairs accumulated. The token is
/// checked before every chunk; a cancelled run returns what it has with
/// `stats.cancelled` set.
pub async fn generate_from_text(
    text: &str,
    generator: &dyn QaGenerator,
    config: &GenerationConfig,
    cancel: &CancelToken,
) -> Result<QaOutput, QaGenError> {
    let start = Instant::now();
    let chunks = chunk::chunk_text(text, config.max_chunk_length)?;
    let total = chunks.len();
    info!(
        "Split text into {} chunks (max {} chars)",
        total, config.max_chunk_length
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(total);
    }

    let mut pairs: Vec<QaPair> = Vec::new();
    let mut results: Vec<ChunkResult> = Vec::with_capacity(total);
    let mut cancelled = false;

    for chunk in &chunks {
        if cancel.is_cancelled() {
            info!("Cancelled after {}/{} chunks", results.len(), total);
            cancelled = true;
            break;
        }

        let chunk_num = chunk.index + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_start(chunk_num, total);
        }
        let chunk_start = Instant::now();

        let prompt =
            prompts::build_prompt(&chunk.text, config.language, config.questions_per_chunk);
        let (raw, retries) = llm::generate_with_retry(generator, &prompt, chunk_num, config).await?;

        let response: Cow<'_, str> = if config.strip_emphasis {
            Cow::Owned(parse::strip_emphasis(&raw))
        } else {
            Cow::Borrowed(&raw)
        };
        let chunk_pairs = parse::parse_qa_response(&response);
        if chunk_pairs.is_empty() {
            warn!(
                "Chunk {}/{}: no question/answer markers in response ({} bytes)",
                chunk_num,
                total,
                raw.len()
            );
        }

        let duration_ms = chunk_start.elapsed().as_millis() as u64;
        debug!(
            "Chunk {}/{}: {} pairs, {} retries, {}ms",
            chunk_num,
            total,
            chunk_pairs.len(),
            retries,
            duration_ms
        );

        pairs.extend(chunk_pairs.iter().cloned());
        if let Some(ref cb) = config.progress_callback {
            cb.on_chunk_complete(chunk_num, total, chunk_pairs.len());
        }

        results.push(ChunkResult {
            chunk_index: chunk.index,
            chunk_chars: chunk.char_len(),
            pairs: chunk_pairs,
            raw_response_len: raw.len(),
            retries,
            duration_ms,
        });
    }

    if pairs.is_empty() && !cancelled {
        warn!("No question/answer pairs were generated");
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(total, pairs.len());
    }

    let generation_duration_ms = start.elapsed().as_millis() as u64;
    let stats = GenerationStats {
        total_chunks: total,
        processed_chunks: results.len(),
        total_pairs: pairs.len(),
        total_chars: text.chars().count(),
        extract_duration_ms: 0,
        generation_duration_ms,
        total_duration_ms: generation_duration_ms,
        cancelled,
    };

    Ok(QaOutput {
        pairs,
        chunks: results,
        metadata: None,
        stats,
        language: config.language,
    })
}

/// Generate pairs and write the rendered document to `output_path`.
///
/// # Errors
/// [`QaGenError::NoContentGenerated`] instead of writing an empty document.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: OutputFormat,
    config: &GenerationConfig,
) -> Result<GenerationStats, QaGenError> {
    let output = generate(input_str, config).await?;
    write_output(&output, output_path.as_ref(), format).await?;
    Ok(output.stats)
}

/// Write a finished run to disk, refusing empty results.
pub async fn write_output(
    output: &QaOutput,
    path: &Path,
    format: OutputFormat,
) -> Result<(), QaGenError> {
    if output.is_empty() {
        return Err(QaGenError::NoContentGenerated {
            chunks: output.stats.processed_chunks,
        });
    }
    render::write_document(path, &output.pairs, output.language, format).await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<QaOutput, QaGenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| QaGenError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input_str, config))
}

/// Generate pairs from PDF bytes held in memory.
///
/// The bytes are written to a [`tempfile::NamedTempFile`] that is removed
/// when this function returns.
pub async fn generate_from_bytes(
    bytes: &[u8],
    config: &GenerationConfig,
) -> Result<QaOutput, QaGenError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| QaGenError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| QaGenError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    generate(&path, config).await
}

/// Read PDF metadata without generating anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    password: Option<&str>,
) -> Result<DocumentMetadata, QaGenError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    extract::extract_metadata(resolved.path(), password).await
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, QaGenError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        QaGenError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most to least specific:
///
/// 1. `config.provider`, used as-is;
/// 2. `config.provider_name` with `config.model`;
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set;
/// 4. OpenAI when `OPENAI_API_KEY` is set;
/// 5. [`ProviderFactory::from_env`] auto-detection.
pub(crate) fn resolve_provider(
    config: &GenerationConfig,
) -> Result<Arc<dyn LLMProvider>, QaGenError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| QaGenError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
