//! # tfkit
//!
//! Drive the Terraform CLI from Rust.
//!
//! This crate provides functionality for:
//! - Running `init`, `plan`, `apply`, `destroy`, `show` and `output` against a
//!   working directory
//! - Interpreting exit codes and output as domain signals (has changes,
//!   current state exists, outputs)
//! - Aborting long-running invocations on cancellation or deadline by killing
//!   the engine's process group
//! - Categorizing engine failures so callers can decide whether to retry
//!
//! ## Example
//!
//! ```no_run
//! use tfkit::{NoInterrupt, Session, backend::default_backend};
//!
//! let backend = default_backend().expect("terraform not available");
//! let mut session = Session::new(&backend, "/tmp/tf-demo");
//!
//! session.init(&NoInterrupt).expect("init failed");
//! if session.plan(&NoInterrupt).expect("plan failed") {
//!     session.apply(&NoInterrupt).expect("apply failed");
//! }
//! ```
//!
//! ## Cancellation
//!
//! Every operation takes an [`Interrupt`]. Implement it over whatever
//! cancellable context the caller has; the runner polls it while the engine
//! runs and returns [`Error::Cancelled`] or [`Error::Timeout`] once it fires.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod process;
pub mod session;
pub mod types;

pub use backend::Backend;
pub use backend::cli::CliBackend;
pub use error::{Error, ErrorCategory, Result};
pub use process::{Interrupt, Interruption, NoInterrupt};
pub use session::{Session, Stage};
pub use types::{CommandOutput, EngineConfig, ExecutionResult, Phase, ShowResult};

use std::path::PathBuf;

/// Resolve the engine executable by name or path.
///
/// Returns [`Error::EngineNotFound`] when nothing executable matches.
pub fn find_engine(name: &str) -> Result<PathBuf> {
    backend::cli::resolve(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_engine_missing() {
        let err = find_engine("definitely-not-a-real-engine-binary").unwrap_err();
        assert!(matches!(err, Error::EngineNotFound { .. }));
        assert_eq!(err.category(), ErrorCategory::EngineNotFound);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Init.to_string(), "init");
        assert_eq!(Phase::Destroy.as_str(), "destroy");
    }
}
