//! Error types for reconcile operations.
//!
//! Every error leaving the lifecycle operations is wrapped in
//! [`Error::Operation`] with the operation name. [`Error::kind`] looks
//! through the wrapper so callers can map errors onto retry decisions and
//! condition messages.

use std::path::PathBuf;
use thiserror::Error;
use tfkit::Phase;

/// Coarse error classes reported to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Workspace directory could not be created or removed
    Workspace,
    /// An input file could not be written or parsed
    Serialization,
    /// The engine failed or was interrupted
    Execution,
    /// A resource of the wrong kind reached this provider
    TypeMismatch,
}

impl ErrorKind {
    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Workspace => "Workspace directory error",
            Self::Serialization => "Cannot write engine inputs",
            Self::Execution => "Engine execution failed",
            Self::TypeMismatch => "Unexpected resource kind",
        }
    }
}

/// Errors that can occur while reconciling a resource.
#[derive(Debug, Error)]
pub enum Error {
    /// Identity cannot be mapped to a workspace
    #[error("invalid identity {identity:?}: {reason}")]
    InvalidIdentity {
        /// Rejected identity
        identity: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Workspace directory create/remove failure
    #[error("workspace {}: {source}", path.display())]
    Workspace {
        /// Directory that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Input file write failure
    #[error("cannot write {}: {source}", path.display())]
    Serialization {
        /// File that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Key that cannot be rendered as an assignment
    #[error("invalid {context} key {key:?}")]
    InvalidKey {
        /// Where the key came from (`variable`, `backend`)
        context: &'static str,
        /// Offending key
        key: String,
    },

    /// Rendered file could not be read back
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        message: String,
    },

    /// Manifest could not be loaded
    #[error("invalid manifest {}: {message}", path.display())]
    Manifest {
        /// Manifest file, or the resource name when no file is involved
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// Engine failure at a given phase
    #[error("engine error: {source}")]
    Execution {
        /// Step that failed
        phase: Phase,
        /// Engine error
        #[source]
        source: tfkit::Error,
    },

    /// Resource of an unexpected kind
    #[error("expected a {expected} resource, got {found:?}")]
    TypeMismatch {
        /// Kind this provider handles
        expected: &'static str,
        /// Kind that was passed
        found: String,
    },

    /// Error wrapped with the lifecycle operation that raised it
    #[error("{operation}: {source}")]
    Operation {
        /// `connect`, `observe`, `create`, `update` or `delete`
        operation: &'static str,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an execution error for `phase`.
    pub fn execution(phase: Phase) -> impl FnOnce(tfkit::Error) -> Self {
        move |source| Self::Execution { phase, source }
    }

    /// Wrap an error with the operation name.
    ///
    /// Already wrapped errors are returned unchanged.
    pub fn in_operation(self, operation: &'static str) -> Self {
        match self {
            Self::Operation { .. } => self,
            other => Self::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through operation wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get the error kind, looking through operation wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Operation { source, .. } => source.kind(),
            Self::InvalidIdentity { .. } | Self::Workspace { .. } => ErrorKind::Workspace,
            Self::Serialization { .. }
            | Self::InvalidKey { .. }
            | Self::Parse { .. }
            | Self::Manifest { .. } => ErrorKind::Serialization,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
        }
    }

    /// Operation name, if the error was wrapped by a lifecycle operation.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    /// Engine phase for execution errors.
    pub fn phase(&self) -> Option<Phase> {
        match self.root() {
            Self::Execution { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether retrying later may succeed without changing the input.
    ///
    /// True for cancellation, deadline, network and state lock failures.
    pub fn is_transient(&self) -> bool {
        match self.root() {
            Self::Execution { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// Result type for reconcile operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn cancelled() -> Error {
        Error::execution(Phase::Apply)(tfkit::Error::Cancelled {
            phase: Phase::Apply,
        })
    }

    #[test]
    fn test_operation_wrapping() {
        let err = cancelled().in_operation("create");

        assert_eq!(err.operation(), Some("create"));
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert_eq!(err.phase(), Some(Phase::Apply));
        assert_eq!(err.to_string(), "create: engine error: apply cancelled");
    }

    #[test]
    fn test_wrapping_is_not_nested() {
        let err = cancelled().in_operation("create").in_operation("reconcile");
        assert_eq!(err.operation(), Some("create"));
    }

    #[test]
    fn test_transient() {
        assert!(cancelled().is_transient());

        let config = Error::execution(Phase::Init)(tfkit::Error::from_engine_output(
            Phase::Init,
            Some(1),
            "Error: Unsupported backend type",
        ));
        assert!(!config.is_transient());

        let mismatch = Error::TypeMismatch {
            expected: "Terraform",
            found: "Bucket".into(),
        };
        assert!(!mismatch.in_operation("observe").is_transient());
    }

    #[test]
    fn test_kinds() {
        let io = || std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(
            Error::Workspace {
                path: "/x".into(),
                source: io()
            }
            .kind(),
            ErrorKind::Workspace
        );
        assert_eq!(
            Error::InvalidKey {
                context: "variable",
                key: "a b".into()
            }
            .kind(),
            ErrorKind::Serialization
        );
    }
}
