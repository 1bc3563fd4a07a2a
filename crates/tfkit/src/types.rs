//! Core types for engine invocations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Engine subcommand being executed.
///
/// Carried by errors so callers can tell which step of the lifecycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// `init`
    Init,
    /// `workspace select` / `workspace new`
    Workspace,
    /// `plan`
    Plan,
    /// `apply`
    Apply,
    /// `destroy`
    Destroy,
    /// `show`
    Show,
    /// `output`
    Output,
}

impl Phase {
    /// Subcommand name as passed to the engine.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Workspace => "workspace",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Show => "show",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to invoke the engine binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Path (or bare name) of the engine executable
    pub program: PathBuf,
    /// Extra environment variables for every invocation
    pub env: BTreeMap<String, String>,
    /// `-parallelism=N` for plan/apply/destroy
    pub parallelism: Option<u32>,
    /// `-refresh=<bool>` for plan/apply/destroy
    pub refresh: Option<bool>,
}

impl EngineConfig {
    /// Config for the given program with engine defaults for everything else.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: BTreeMap::new(),
            parallelism: None,
            refresh: None,
        }
    }

    /// Add an environment variable passed to every invocation.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("terraform")
    }
}

/// Output of one engine process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
    /// Exit code; `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// What `show` reported about the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowResult {
    /// Whether any state could be retrieved
    pub state_exists: bool,
    /// Root module outputs recorded in the state
    pub outputs: BTreeMap<String, String>,
}

impl ShowResult {
    /// A result describing "nothing has been created yet".
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Domain signals gathered over one [`Session`](crate::Session).
///
/// Built fresh for every session; never carried across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// `init` succeeded
    pub initialized: bool,
    /// The last plan reported changes
    pub has_changes: bool,
    /// Outputs read from state or `output`
    pub outputs: BTreeMap<String, String>,
    /// Some state is recorded for the configuration
    pub current_state_exists: bool,
}
