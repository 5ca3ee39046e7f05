//! Background generation jobs.
//!
//! [`QaJob::spawn`] runs [`crate::generate::generate_with_cancel`] on a tokio
//! task and reports back over an unbounded channel: one
//! [`JobEvent::Progress`] after every parsed chunk, then exactly one terminal
//! event, [`JobEvent::Completed`] or [`JobEvent::Failed`]. The channel closes
//! after the terminal event.
//!
//! ```rust,no_run
//! use edgequake_pdf2qa::{GenerationConfig, JobEvent, QaJob};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut job = QaJob::spawn("lecture.pdf", GenerationConfig::default());
//! while let Some(event) = job.next_event().await {
//!     match event {
//!         JobEvent::Progress { completed, total } => eprintln!("{completed}/{total}"),
//!         JobEvent::Completed(out) => println!("{} pairs", out.pairs.len()),
//!         JobEvent::Failed(e) => eprintln!("error: {e}"),
//!     }
//! }
//! # }
//! ```

use crate::config::GenerationConfig;
use crate::error::QaGenError;
use crate::generate;
use crate::output::QaOutput;
use crate::pipeline::llm::QaGenerator;
use crate::progress::{GenerationProgressCallback, ProgressCallback};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

/// Cooperative cancellation flag, checked between chunks.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Something a running job reports.
#[derive(Debug)]
pub enum JobEvent {
    /// `completed` of `total` chunks have been parsed.
    Progress { completed: usize, total: usize },
    Completed(QaOutput),
    Failed(QaGenError),
}

impl JobEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress { .. })
    }

    /// Completed fraction in `0.0..=1.0` for progress events.
    pub fn fraction(&self) -> Option<f64> {
        match *self {
            JobEvent::Progress { completed, total } if total > 0 => {
                Some(completed as f64 / total as f64)
            }
            _ => None,
        }
    }
}

/// Handle to a spawned job.
///
/// Dropping the handle does not stop the job; call [`JobHandle::cancel`].
pub struct JobHandle {
    events: mpsc::UnboundedReceiver<JobEvent>,
    cancel: CancelToken,
    task: JoinHandle<()>,
}

impl JobHandle {
    /// A token that cancels this job; can be moved to another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Stop after the chunk in flight; the job then completes with the
    /// pairs gathered so far.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or `None` once the terminal event has been received.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        self.events.recv().await
    }

    /// Adapt the event channel into a `Stream`.
    pub fn into_stream(self) -> UnboundedReceiverStream<JobEvent> {
        UnboundedReceiverStream::new(self.events)
    }

    /// Skip progress events and return the job's result.
    pub async fn wait(mut self) -> Result<QaOutput, QaGenError> {
        while let Some(event) = self.events.recv().await {
            match event {
                JobEvent::Completed(output) => return Ok(output),
                JobEvent::Failed(err) => return Err(err),
                JobEvent::Progress { .. } => {}
            }
        }
        match self.task.await {
            Err(e) => Err(QaGenError::Internal(format!("Generation task failed: {e}"))),
            Ok(()) => Err(QaGenError::Internal(
                "Generation task ended without a result".to_string(),
            )),
        }
    }
}

/// Spawns generation runs onto the current tokio runtime.
pub struct QaJob;

impl QaJob {
    /// Generate pairs for a PDF path or URL in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(input: impl Into<String>, config: GenerationConfig) -> JobHandle {
        let input = input.into();
        Self::spawn_with(config, move |config, cancel| async move {
            generate::generate_with_cancel(&input, &config, &cancel).await
        })
    }

    /// Run the chunk loop over already-extracted text with a caller-supplied
    /// generator.
    pub fn spawn_from_text(
        text: impl Into<String>,
        generator: Arc<dyn QaGenerator>,
        config: GenerationConfig,
    ) -> JobHandle {
        let text = text.into();
        Self::spawn_with(config, move |config, cancel| async move {
            generate::generate_from_text(&text, generator.as_ref(), &config, &cancel).await
        })
    }

    fn spawn_with<F, Fut>(mut config: GenerationConfig, run: F) -> JobHandle
    where
        F: FnOnce(GenerationConfig, CancelToken) -> Fut,
        Fut: std::future::Future<Output = Result<QaOutput, QaGenError>> + Send + 'static,
    {
        let (tx, events) = mpsc::unbounded_channel();
        let cancel = CancelToken::new();

        config.progress_callback = Some(Arc::new(ChannelProgress {
            tx: tx.clone(),
            inner: config.progress_callback.take(),
        }));

        let fut = run(config, cancel.clone());
        let task = tokio::spawn(async move {
            let event = match fut.await {
                Ok(output) => JobEvent::Completed(output),
                Err(err) => JobEvent::Failed(err),
            };
            if tx.send(event).is_err() {
                debug!("Job receiver dropped before completion");
            }
        });

        JobHandle {
            events,
            cancel,
            task,
        }
    }
}

/// Forwards chunk completions into the job channel, then to the caller's
/// own callback if one was configured.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<JobEvent>,
    inner: Option<ProgressCallback>,
}

impl GenerationProgressCallback for ChannelProgress {
    fn on_generation_start(&self, total_chunks: usize) {
        if let Some(ref cb) = self.inner {
            cb.on_generation_start(total_chunks);
        }
    }

    fn on_chunk_start(&self, chunk_num: usize, total_chunks: usize) {
        if let Some(ref cb) = self.inner {
            cb.on_chunk_start(chunk_num, total_chunks);
        }
    }

    fn on_chunk_retry(&self, chunk_num: usize, attempt: u32, wait_ms: u64) {
        if let Some(ref cb) = self.inner {
            cb.on_chunk_retry(chunk_num, attempt, wait_ms);
        }
    }

    fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, pair_count: usize) {
        // Receiver gone means nobody is listening; the run itself goes on.
        let _ = self.tx.send(JobEvent::Progress {
            completed: chunk_num,
            total: total_chunks,
        });
        if let Some(ref cb) = self.inner {
            cb.on_chunk_complete(chunk_num, total_chunks, pair_count);
        }
    }

    fn on_generation_complete(&self, total_chunks: usize, total_pairs: usize) {
        if let Some(ref cb) = self.inner {
            cb.on_generation_complete(total_chunks, total_pairs);
        }
    }
}
