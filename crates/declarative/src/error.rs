//! Errors raised by the batch driver itself.
//!
//! Failures of individual resources never surface here; they are recorded
//! per resource as [`ReconcileOutcome::Failed`](crate::ReconcileOutcome::Failed).

use thiserror::Error;

/// Errors that abort a whole batch.
#[derive(Debug, Error)]
pub enum Error {
    /// Worker pool could not be started
    #[error("failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for batch operations.
pub type Result<T> = std::result::Result<T, Error>;
