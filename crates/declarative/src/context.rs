//! Call context and provider traits
//!
//! A [`Context`] travels with every lifecycle call. It carries the caller's
//! cancellation token and an optional deadline; implementations must stop
//! long-running work once [`Context::status`] reports [`Done`].

use crate::types::ReconcileReport;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a token handed to a signal handler
/// cancels every context built from it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a context stopped being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Done {
    /// The token was cancelled
    Cancelled,
    /// The deadline passed
    DeadlineExceeded,
}

impl fmt::Display for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("context cancelled"),
            Self::DeadlineExceeded => f.write_str("context deadline exceeded"),
        }
    }
}

/// Cancellable context passed to every lifecycle call.
#[derive(Debug, Clone)]
pub struct Context {
    token: CancelToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::with_token(CancelToken::new())
    }

    /// A context cancelled through `token`.
    pub fn with_token(token: CancelToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a context that also expires `timeout` from now.
    ///
    /// An earlier existing deadline is kept. A timeout too large to
    /// represent as an instant adds no deadline.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Derive a context that also expires at `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The cancellation token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `Some` once the context is cancelled or expired.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn status(&self) -> Option<Done> {
        if self.token.is_cancelled() {
            return Some(Done::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Done::DeadlineExceeded),
            _ => None,
        }
    }

    /// Whether the context is cancelled or expired.
    pub fn is_done(&self) -> bool {
        self.status().is_some()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

/// Progress callback for batch reconciliation
///
/// Implement this trait to receive progress updates during [`reconcile_all`](crate::reconcile_all).
pub trait ProgressCallback: Send {
    /// Called before the batch starts
    fn on_batch_start(&mut self, count: usize);

    /// Called when a resource finished, successfully or not
    fn on_resource_complete(&mut self, report: &ReconcileReport);

    /// Called when the batch completes
    fn on_batch_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_batch_start(&mut self, _count: usize) {}
    fn on_resource_complete(&mut self, _report: &ReconcileReport) {}
    fn on_batch_complete(&mut self) {}
}
