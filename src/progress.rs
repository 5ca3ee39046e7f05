//! Progress-callback trait for per-chunk generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the chunks. The CLI drives an
//! `indicatif` bar from it; [`crate::job::QaJob`] forwards it into a channel.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2qa::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PairCounter {
//!     pairs: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for PairCounter {
//!     fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, pair_count: usize) {
//!         self.pairs.fetch_add(pair_count, Ordering::SeqCst);
//!         eprintln!("chunk {chunk_num}/{total_chunks}: {pair_count} pairs");
//!     }
//! }
//!
//! let counter = Arc::new(PairCounter { pairs: AtomicUsize::new(0) });
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation loop as it processes each chunk.
///
/// Chunks are processed sequentially, so calls never overlap within one
/// run, but the callback may live on another thread than the caller.
/// All methods default to no-ops.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once, after chunking, before the first generation call.
    fn on_generation_start(&self, total_chunks: usize) {
        let _ = total_chunks;
    }

    /// Called just before the prompt for a chunk is sent.
    ///
    /// `chunk_num` is 1-indexed.
    fn on_chunk_start(&self, chunk_num: usize, total_chunks: usize) {
        let _ = (chunk_num, total_chunks);
    }

    /// Called when a rate-limited call is about to be retried.
    fn on_chunk_retry(&self, chunk_num: usize, attempt: u32, wait_ms: u64) {
        let _ = (chunk_num, attempt, wait_ms);
    }

    /// Called after a chunk's response has been parsed and accumulated.
    ///
    /// `chunk_num / total_chunks` is the completed fraction of the run.
    fn on_chunk_complete(&self, chunk_num: usize, total_chunks: usize, pair_count: usize) {
        let _ = (chunk_num, total_chunks, pair_count);
    }

    /// Called once when the loop ends, normally or by cancellation.
    fn on_generation_complete(&self, total_chunks: usize, total_pairs: usize) {
        let _ = (total_chunks, total_pairs);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        retries: AtomicUsize,
        pairs: AtomicUsize,
        completed_pairs: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_generation_start(&self, total_chunks: usize) {
            self.started_total.store(total_chunks, Ordering::SeqCst);
        }

        fn on_chunk_start(&self, _chunk_num: usize, _total_chunks: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_retry(&self, _chunk_num: usize, _attempt: u32, _wait_ms: u64) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_chunk_complete(&self, _chunk_num: usize, _total_chunks: usize, pair_count: usize) {
            self.pairs.fetch_add(pair_count, Ordering::SeqCst);
        }

        fn on_generation_complete(&self, _total_chunks: usize, total_pairs: usize) {
            self.completed_pairs.store(total_pairs, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_generation_start(3);
        cb.on_chunk_start(1, 3);
        cb.on_chunk_retry(1, 1, 1000);
        cb.on_chunk_complete(1, 3, 2);
        cb.on_generation_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_generation_start(2);
        tracker.on_chunk_start(1, 2);
        tracker.on_chunk_retry(1, 1, 1000);
        tracker.on_chunk_complete(1, 2, 2);
        tracker.on_chunk_start(2, 2);
        tracker.on_chunk_complete(2, 2, 1);
        tracker.on_generation_complete(2, 3);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.retries.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pairs.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completed_pairs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_generation_start(10);
        cb.on_chunk_complete(1, 10, 2);
    }
}
