//! CLI binary for edgequake-pdf2qa.
//!
//! Maps CLI flags to `GenerationConfig`, runs the job with an indicatif
//! progress bar and writes the rendered document.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2qa::pipeline::render::ensure_extension;
use edgequake_pdf2qa::{
    inspect, write_output, GenerationConfig, GenerationProgressCallback, JobEvent, OutputFormat,
    OutputLanguage, ProgressCallback, QaJob, QaOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF is opened, then a chunk bar with one log line per
/// chunk.
struct CliProgressCallback {
    bar: ProgressBar,
    chunk_started: Mutex<Option<Instant>>,
    pairs: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting text…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            chunk_started: Mutex::new(None),
            pairs: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Generating");
        self.bar.reset_eta();
    }

    fn chunk_elapsed_secs(&self) -> f64 {
        self.chunk_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self, total_chunks: usize) {
        self.activate_bar(total_chunks);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating questions for {total_chunks} chunks…"))
        ));
    }

    fn on_chunk_start(&self, chunk_num: usize, _total_chunks: usize) {
        if let Ok(mut started) = self.chunk_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("chunk {chunk_num}"));
    }

    fn on_chunk_retry(&self, chunk_num: usize, attempt: u32, wait_ms: u64) {
        self.bar.println(format!(
            "  {} Chunk {:>3}  rate limited, retry {} in {}",
            yellow("↻"),
            chunk_num,
            attempt,
            dim(&format!("{:.1}s", wait_ms as f64 / 1000.0)),
        ));
    }

    fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, pair_count: usize) {
        self.pairs.fetch_add(pair_count, Ordering::SeqCst);
        let mark = if pair_count == 0 {
            yellow("⚠")
        } else {
            green("✓")
        };
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {:<9}  {}",
            mark,
            chunk_num,
            total_chunks,
            dim(&format!("{pair_count:>2} pairs")),
            dim(&format!("{:.1}s", self.chunk_elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_generation_complete(&self, total_chunks: usize, total_pairs: usize) {
        self.bar.finish_and_clear();
        let done = self.bar.position() as usize;
        if done == total_chunks {
            eprintln!(
                "{} {} pairs from {} chunks",
                green("✔"),
                bold(&total_pairs.to_string()),
                total_chunks
            );
        } else {
            eprintln!(
                "{} {} pairs from {}/{} chunks (stopped early)",
                yellow("⚠"),
                bold(&total_pairs.to_string()),
                done,
                total_chunks
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Italian Q&A document (default)
  pdfqa lecture.pdf

  # English, Markdown output
  pdfqa lecture.pdf --language english -o notes.md

  # Smaller chunks, more questions per chunk
  pdfqa --chunk-size 2000 --questions 4 book.pdf -o book_qa.pdf

  # Use a specific model
  pdfqa --provider anthropic --model claude-sonnet-4-20250514 paper.pdf

  # From a URL
  pdfqa https://arxiv.org/pdf/1706.03762 -o attention_qa.pdf

  # Inspect PDF metadata (no API key needed)
  pdfqa --inspect-only lecture.pdf

  # Structured JSON on stdout (document is still written)
  pdfqa --json lecture.pdf > run.json

LANGUAGES:
  english (en), italian (it, italiano), french (fr, français),
  spanish (es, español), german (de, deutsch)

  Ctrl-C stops after the chunk in flight and writes the pairs gathered so far.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium
"#;

/// Generate exam-style questions and answers from a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Generate questions and answers from PDF documents using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output document path.
    #[arg(short, long, env = "PDFQA_OUTPUT", default_value = "questions_answers.pdf")]
    output: PathBuf,

    /// Output format; inferred from the output extension when omitted.
    #[arg(long, env = "PDFQA_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Language of the generated questions and answers.
    #[arg(short, long, env = "PDFQA_LANGUAGE", default_value = "italian")]
    language: OutputLanguage,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Maximum characters per chunk sent to the model.
    #[arg(long, env = "PDFQA_CHUNK_SIZE", default_value_t = 4000)]
    chunk_size: usize,

    /// Questions requested per chunk.
    #[arg(long, env = "PDFQA_QUESTIONS", default_value_t = 2)]
    questions: usize,

    /// Retries per chunk when rate limited.
    #[arg(long, env = "PDFQA_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFQA_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFQA_PASSWORD")]
    password: Option<String>,

    /// Also print the run (pairs, per-chunk results, stats) as JSON on stdout.
    #[arg(long, env = "PDFQA_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFQA_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no generation.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFQA_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Pdf,
    #[value(alias = "md")]
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives the user-facing feedback; library INFO logs
    // would tear it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let format = cli
        .format
        .map(OutputFormat::from)
        .unwrap_or_else(|| OutputFormat::from_path(&cli.output));
    let output_path = ensure_extension(&cli.output, format);

    // ── Run the job ──────────────────────────────────────────────────────
    let output = run_job(&cli.input, config, cli.quiet)
        .await
        .context("Generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    write_output(&output, &output_path, format)
        .await
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if !cli.quiet {
        eprintln!(
            "{}  {} pairs  {}/{} chunks  {}ms  →  {}",
            if output.stats.cancelled {
                yellow("⚠")
            } else {
                green("✔")
            },
            output.stats.total_pairs,
            output.stats.processed_chunks,
            output.stats.total_chunks,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Spawn the generation job and wait for it, cancelling on Ctrl-C.
async fn run_job(input: &str, config: GenerationConfig, quiet: bool) -> Result<QaOutput> {
    let mut job = QaJob::spawn(input, config);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = job.next_event() => match event {
                Some(JobEvent::Completed(output)) => return Ok(output),
                Some(JobEvent::Failed(err)) => return Err(err.into()),
                Some(JobEvent::Progress { .. }) => {}
                None => anyhow::bail!("generation ended without a result"),
            },
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                signal.context("Failed to listen for Ctrl-C")?;
                interrupted = true;
                job.cancel();
                if !quiet {
                    eprintln!(
                        "{} Interrupted, finishing the current chunk…",
                        yellow("⚠")
                    );
                }
            }
        }
    }
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .language(cli.language)
        .max_chunk_length(cli.chunk_size)
        .questions_per_chunk(cli.questions)
        .max_retries(cli.max_retries)
        .temperature(cli.temperature)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
