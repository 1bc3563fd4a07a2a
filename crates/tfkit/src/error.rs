//! Error types for engine operations.
//!
//! Errors are categorized so the caller (usually a reconcile scheduler) can
//! decide whether a failure is worth retrying on its own backoff schedule.
//! This crate never retries by itself.

use crate::types::Phase;
use std::time::Duration;
use thiserror::Error;

/// Categories of engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The caller cancelled the operation
    Cancelled,
    /// The caller's deadline expired
    Timeout,
    /// Network-related failure talking to a provider or backend
    Network,
    /// Another process holds the state lock
    Locked,
    /// Invalid configuration, unreachable backend settings, bad syntax
    Configuration,
    /// Engine binary missing or not executable
    EngineNotFound,
    /// Operation attempted before `init`
    NotInitialized,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this category is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Timeout | Self::Network | Self::Locked
        )
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Cancelled => "Operation cancelled",
            Self::Timeout => "Deadline exceeded",
            Self::Network => "Network connectivity issue",
            Self::Locked => "State is locked",
            Self::Configuration => "Invalid configuration",
            Self::EngineNotFound => "Engine binary not found",
            Self::NotInitialized => "Workspace not initialized",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Cancelled | Self::Timeout => {
                "The engine was stopped; the next reconcile re-assesses the real state"
            }
            Self::Network => "Check connectivity to the provider APIs and state backend",
            Self::Locked => "Wait for the other run to finish or release the lock manually",
            Self::Configuration => "Fix the configuration; retrying will not help",
            Self::EngineNotFound => "Install terraform or point the engine setting at it",
            Self::NotInitialized => "Run init before any other engine operation",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while driving the engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Engine executable could not be found
    #[error("engine not found: {name}")]
    EngineNotFound {
        /// Name or path that was looked up
        name: String,
    },

    /// Engine process could not be started
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A lifecycle step ran before `init` succeeded
    #[error("{phase} requires an initialized workspace")]
    NotInitialized {
        /// Step that was attempted
        phase: Phase,
    },

    /// Cancelled by the caller; the engine process group was killed
    #[error("{phase} cancelled")]
    Cancelled {
        /// Step that was interrupted
        phase: Phase,
    },

    /// Deadline exceeded; the engine process group was killed
    #[error("{phase} timed out after {elapsed:?}")]
    Timeout {
        /// Step that was interrupted
        phase: Phase,
        /// Time spent in the step before it was stopped
        elapsed: Duration,
    },

    /// Network failure reported by the engine
    #[error("{phase}: network error: {message}")]
    Network {
        /// Step that failed
        phase: Phase,
        /// Engine stderr
        message: String,
    },

    /// State lock held by someone else
    #[error("{phase}: state locked: {message}")]
    Locked {
        /// Step that failed
        phase: Phase,
        /// Engine stderr
        message: String,
    },

    /// Configuration rejected by the engine
    #[error("{phase}: invalid configuration: {message}")]
    Configuration {
        /// Step that failed
        phase: Phase,
        /// Engine stderr
        message: String,
    },

    /// Engine exited unsuccessfully for another reason
    #[error("{phase} failed (exit code {code:?}): {stderr}")]
    CommandFailed {
        /// Step that failed
        phase: Phase,
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Engine stderr
        stderr: String,
    },

    /// Engine output could not be interpreted
    #[error("{phase}: unexpected output: {message}")]
    Parse {
        /// Step whose output was malformed
        phase: Phase,
        /// What was wrong with it
        message: String,
    },

    /// IO error while supervising the engine process
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category for retry decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::EngineNotFound { .. } | Error::Spawn { .. } => ErrorCategory::EngineNotFound,
            Error::NotInitialized { .. } => ErrorCategory::NotInitialized,
            Error::Cancelled { .. } => ErrorCategory::Cancelled,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::Network { .. } => ErrorCategory::Network,
            Error::Locked { .. } => ErrorCategory::Locked,
            Error::Configuration { .. } => ErrorCategory::Configuration,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the engine was stopped by cancellation or deadline.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Error::Cancelled { .. } | Error::Timeout { .. })
    }

    /// Lifecycle step the error belongs to, if any.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::NotInitialized { phase }
            | Error::Cancelled { phase }
            | Error::Timeout { phase, .. }
            | Error::Network { phase, .. }
            | Error::Locked { phase, .. }
            | Error::Configuration { phase, .. }
            | Error::CommandFailed { phase, .. }
            | Error::Parse { phase, .. } => Some(*phase),
            Error::EngineNotFound { .. } | Error::Spawn { .. } | Error::Io(_) => None,
        }
    }

    /// Create an error from a failed engine invocation.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_engine_output(phase: Phase, code: Option<i32>, stderr: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let message = stderr.trim().to_string();

        if stderr_lower.contains("error acquiring the state lock")
            || stderr_lower.contains("state lock")
            || stderr_lower.contains("conditionalcheckfailed")
        {
            return Error::Locked { phase, message };
        }

        if stderr_lower.contains("no such host")
            || stderr_lower.contains("could not resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("connection reset")
            || stderr_lower.contains("i/o timeout")
            || stderr_lower.contains("tls handshake")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("failed to query available provider packages")
        {
            return Error::Network { phase, message };
        }

        if stderr_lower.contains("unsupported argument")
            || stderr_lower.contains("unsupported block type")
            || stderr_lower.contains("argument or block definition required")
            || stderr_lower.contains("invalid block definition")
            || stderr_lower.contains("missing required argument")
            || stderr_lower.contains("invalid backend configuration")
            || stderr_lower.contains("unsupported backend type")
            || stderr_lower.contains("no value for required variable")
            || stderr_lower.contains("reference to undeclared")
        {
            return Error::Configuration { phase, message };
        }

        Error::CommandFailed {
            phase,
            code,
            stderr: message,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Cancelled.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(ErrorCategory::Locked.is_retryable());
        assert!(!ErrorCategory::Configuration.is_retryable());
        assert!(!ErrorCategory::NotInitialized.is_retryable());
    }

    #[test]
    fn test_from_engine_output_network() {
        let err = Error::from_engine_output(
            Phase::Init,
            Some(1),
            "Error: Failed to query available provider packages\n\ndial tcp: lookup registry.terraform.io: no such host",
        );
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.phase(), Some(Phase::Init));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_engine_output_locked() {
        let err = Error::from_engine_output(
            Phase::Apply,
            Some(1),
            "Error: Error acquiring the state lock\n\nLock Info: ...",
        );
        assert_eq!(err.category(), ErrorCategory::Locked);
    }

    #[test]
    fn test_from_engine_output_configuration() {
        let err = Error::from_engine_output(
            Phase::Plan,
            Some(1),
            "Error: Unsupported argument\n\n  on main.tf line 3",
        );
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_from_engine_output_other() {
        let err = Error::from_engine_output(Phase::Destroy, Some(1), "Error: boom");
        assert_eq!(err.category(), ErrorCategory::Other);
        match err {
            Error::CommandFailed { phase, code, stderr } => {
                assert_eq!(phase, Phase::Destroy);
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "Error: boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_interruption() {
        assert!(Error::Cancelled { phase: Phase::Apply }.is_interruption());
        assert!(
            Error::Timeout {
                phase: Phase::Plan,
                elapsed: Duration::from_secs(1)
            }
            .is_interruption()
        );
        assert!(!Error::NotInitialized { phase: Phase::Plan }.is_interruption());
    }
}
