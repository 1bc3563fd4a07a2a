//! Per-workspace lifecycle state machine.
//!
//! A [`Session`] covers one generation of a working directory:
//!
//! ```text
//! Uninitialized ──init──▶ Initialized ──plan──▶ Planned ──apply──▶ Applied
//!                              │                   │
//!                              └─────destroy───────┴──────────────▶ Destroyed
//! ```
//!
//! Every step other than `init` is refused until `init` has succeeded, so the
//! engine never runs against a directory it has not prepared.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::process::Interrupt;
use crate::types::{ExecutionResult, Phase, ShowResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where a session is in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// `init` has not succeeded yet
    Uninitialized,
    /// Ready for any other operation
    Initialized,
    /// A plan was computed
    Planned,
    /// The configuration was applied
    Applied,
    /// The configuration was destroyed
    Destroyed,
}

/// Drives one backend against one working directory.
pub struct Session<'a> {
    backend: &'a dyn Backend,
    dir: PathBuf,
    stage: Stage,
    result: ExecutionResult,
}

impl<'a> Session<'a> {
    /// Start a new, uninitialized session for `dir`.
    pub fn new(backend: &'a dyn Backend, dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            dir: dir.into(),
            stage: Stage::Uninitialized,
            result: ExecutionResult::default(),
        }
    }

    /// Working directory of this session.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Signals gathered so far.
    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    /// Consume the session, returning the gathered signals.
    pub fn into_result(self) -> ExecutionResult {
        self.result
    }

    /// Run `init` once per session; later calls are no-ops.
    pub fn init(&mut self, interrupt: &dyn Interrupt) -> Result<()> {
        if self.stage != Stage::Uninitialized {
            return Ok(());
        }
        self.backend.init(&self.dir, interrupt)?;
        self.stage = Stage::Initialized;
        self.result.initialized = true;
        Ok(())
    }

    /// Switch to the named engine workspace, creating it when missing.
    pub fn select_workspace(&mut self, name: &str, interrupt: &dyn Interrupt) -> Result<()> {
        self.require(Phase::Workspace)?;
        self.backend.select_workspace(&self.dir, name, interrupt)
    }

    /// Compute a plan; returns whether it has changes.
    pub fn plan(&mut self, interrupt: &dyn Interrupt) -> Result<bool> {
        self.require(Phase::Plan)?;
        let has_changes = self.backend.plan(&self.dir, interrupt)?;
        self.stage = Stage::Planned;
        self.result.has_changes = has_changes;
        Ok(has_changes)
    }

    /// Apply the configuration.
    ///
    /// On error the external system may be partially changed; nothing is
    /// rolled back.
    pub fn apply(&mut self, interrupt: &dyn Interrupt) -> Result<()> {
        self.require(Phase::Apply)?;
        self.backend.apply(&self.dir, interrupt)?;
        self.stage = Stage::Applied;
        self.result.current_state_exists = true;
        Ok(())
    }

    /// Destroy everything the configuration describes.
    pub fn destroy(&mut self, interrupt: &dyn Interrupt) -> Result<()> {
        self.require(Phase::Destroy)?;
        self.backend.destroy(&self.dir, interrupt)?;
        self.stage = Stage::Destroyed;
        self.result.current_state_exists = false;
        self.result.outputs.clear();
        Ok(())
    }

    /// Read the current state without mutating anything.
    pub fn show(&mut self, interrupt: &dyn Interrupt) -> Result<ShowResult> {
        self.require(Phase::Show)?;
        let show = self.backend.show(&self.dir, interrupt)?;
        self.result.current_state_exists = show.state_exists;
        self.result.outputs = show.outputs.clone();
        Ok(show)
    }

    /// Read root module outputs.
    pub fn outputs(&mut self, interrupt: &dyn Interrupt) -> Result<BTreeMap<String, String>> {
        self.require(Phase::Output)?;
        let outputs = self.backend.output(&self.dir, interrupt)?;
        self.result.outputs = outputs.clone();
        Ok(outputs)
    }

    fn require(&self, phase: Phase) -> Result<()> {
        if self.stage == Stage::Uninitialized {
            return Err(Error::NotInitialized { phase });
        }
        Ok(())
    }
}
