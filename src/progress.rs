//! Progress reporting and cancellation
//!
//! The pipeline reports progress synchronously at phase boundaries and checks
//! for cancellation only between ecotope-level steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives progress updates from a pipeline run
pub trait ProgressObserver: Send + Sync {
    /// `step` counts from 1 up to and including `total`
    fn on_progress(&self, step: usize, total: usize, message: &str);
}

impl<F> ProgressObserver for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn on_progress(&self, step: usize, total: usize, message: &str) {
        self(step, total, message)
    }
}

/// Observer that ignores all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _step: usize, _total: usize, _message: &str) {}
}

/// Shared flag for cancelling a run from another thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
