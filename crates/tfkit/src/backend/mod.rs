//! Backend abstraction for engine operations.
//!
//! The [`Backend`] trait defines the interface for driving the engine against
//! a working directory, allowing for different implementations (real CLI,
//! in-memory fakes for testing).

pub mod cli;

use crate::error::Result;
use crate::process::Interrupt;
use crate::types::ShowResult;
use std::collections::BTreeMap;
use std::path::Path;

/// Backend trait for engine operations.
///
/// Every method runs synchronously against `dir`, the engine's working
/// directory, and must abort promptly once `interrupt` fires.
pub trait Backend: Send + Sync {
    /// Prepare the working directory (providers, modules, backend).
    fn init(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()>;

    /// Select the named engine workspace, creating it if missing.
    fn select_workspace(&self, dir: &Path, name: &str, interrupt: &dyn Interrupt) -> Result<()>;

    /// Compute a plan; returns whether it contains changes.
    fn plan(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<bool>;

    /// Realize the configuration against the external system.
    fn apply(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()>;

    /// Tear down everything the configuration describes.
    fn destroy(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()>;

    /// Read the current state without changing anything.
    fn show(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<ShowResult>;

    /// Read root module outputs.
    fn output(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<BTreeMap<String, String>>;
}

/// Get the default backend (engine CLI found on `PATH`).
pub fn default_backend() -> Result<cli::CliBackend> {
    cli::CliBackend::discover("terraform")
}
