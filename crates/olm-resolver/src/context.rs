//! Cancellation and deadlines for a single resolution

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why a resolution stopped before producing an answer
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("resolution cancelled")]
    Cancelled,
    #[error("resolution deadline exceeded")]
    DeadlineExceeded,
}

/// Carries a cancellation flag and an optional deadline into a resolution.
///
/// Clones share the flag, so a clone handed to another thread can cancel
/// a resolution in progress.
#[derive(Debug, Clone, Default)]
pub struct ResolveContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ResolveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail if the resolution was cancelled or ran past its deadline
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
