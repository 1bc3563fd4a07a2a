//! In-memory engine used by the provider integration tests.
//!
//! State lives in a file inside each workspace: `apply` snapshots the rendered
//! inputs, `plan` compares the snapshot with the current inputs, `destroy`
//! removes it. Every call is recorded per workspace.

#![allow(dead_code)]

use provider::workspace::RENDERED_FILES;
use provider::{ProviderOptions, TerraformConnector, WorkspaceManager};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tfkit::{Backend, Error, Interrupt, Interruption, Phase, Result, ShowResult};

pub const STATE_FILE: &str = ".fake.tfstate";

#[derive(Default)]
pub struct FakeBackend {
    pub(crate) calls: Mutex<Vec<(PathBuf, &'static str)>>,
    pub(crate) selected: Mutex<Vec<String>>,
    /// Outputs reported once state exists
    pub outputs: BTreeMap<String, String>,
    /// `show` fails the way the engine does without a state file
    pub fail_show: bool,
    pub fail_plan: bool,
    pub fail_apply: bool,
    pub fail_destroy: bool,
}

impl FakeBackend {
    pub fn with_outputs(outputs: &[(&str, &str)]) -> Self {
        Self {
            outputs: outputs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Default::default()
        }
    }

    /// Number of calls of `op` across all workspaces.
    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, call)| *call == op)
            .count()
    }

    /// Calls made against one workspace, in order.
    pub fn calls_in(&self, dir: &Path) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(d, _)| d == dir)
            .map(|(_, call)| *call)
            .collect()
    }

    /// Engine workspaces selected, in order.
    pub fn selected(&self) -> Vec<String> {
        self.selected.lock().unwrap().clone()
    }

    fn enter(&self, phase: Phase, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        if let Some(reason) = interrupt.check() {
            return Err(match reason {
                Interruption::Cancelled => Error::Cancelled { phase },
                Interruption::DeadlineExceeded => Error::Timeout {
                    phase,
                    elapsed: Duration::ZERO,
                },
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push((dir.to_path_buf(), phase.as_str()));
        Ok(())
    }
}

fn failed(phase: Phase) -> Error {
    Error::CommandFailed {
        phase,
        code: Some(1),
        stderr: format!("Error: {phase} failed"),
    }
}

/// Snapshot of everything rendered into `dir`.
fn desired(dir: &Path) -> String {
    RENDERED_FILES
        .iter()
        .filter_map(|name| {
            fs::read_to_string(dir.join(name))
                .ok()
                .map(|text| format!("## {name}\n{text}"))
        })
        .collect()
}

impl Backend for FakeBackend {
    fn init(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        self.enter(Phase::Init, dir, interrupt)
    }

    fn select_workspace(&self, dir: &Path, name: &str, interrupt: &dyn Interrupt) -> Result<()> {
        self.enter(Phase::Workspace, dir, interrupt)?;
        self.selected.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn plan(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<bool> {
        self.enter(Phase::Plan, dir, interrupt)?;
        if self.fail_plan {
            return Err(failed(Phase::Plan));
        }
        let state = fs::read_to_string(dir.join(STATE_FILE)).ok();
        Ok(state.as_deref() != Some(desired(dir).as_str()))
    }

    fn apply(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        self.enter(Phase::Apply, dir, interrupt)?;
        if self.fail_apply {
            return Err(failed(Phase::Apply));
        }
        fs::write(dir.join(STATE_FILE), desired(dir))?;
        Ok(())
    }

    fn destroy(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        self.enter(Phase::Destroy, dir, interrupt)?;
        if self.fail_destroy {
            return Err(failed(Phase::Destroy));
        }
        match fs::remove_file(dir.join(STATE_FILE)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn show(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<ShowResult> {
        self.enter(Phase::Show, dir, interrupt)?;
        if self.fail_show {
            return Err(Error::CommandFailed {
                phase: Phase::Show,
                code: Some(1),
                stderr: "No state file was found!".to_string(),
            });
        }
        if !dir.join(STATE_FILE).exists() {
            return Ok(ShowResult::empty());
        }
        Ok(ShowResult {
            state_exists: true,
            outputs: self.outputs.clone(),
        })
    }

    fn output(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<BTreeMap<String, String>> {
        self.enter(Phase::Output, dir, interrupt)?;
        if dir.join(STATE_FILE).exists() {
            Ok(self.outputs.clone())
        } else {
            Ok(BTreeMap::new())
        }
    }
}

/// Connector over a fake backend in a fresh temporary root.
pub struct Harness {
    pub root: TempDir,
    pub backend: Arc<FakeBackend>,
    pub connector: TerraformConnector,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeBackend::default(), ProviderOptions::default())
    }

    pub fn with(backend: FakeBackend, options: ProviderOptions) -> Self {
        let root = TempDir::new().unwrap();
        let backend = Arc::new(backend);
        let connector = TerraformConnector::new(
            Arc::new(WorkspaceManager::new(root.path().join("workspaces"))),
            Arc::clone(&backend) as Arc<dyn Backend>,
            options,
        );
        Self {
            root,
            backend,
            connector,
        }
    }
}
