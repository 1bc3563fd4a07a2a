pub mod doctor;
pub mod lifecycle;
pub mod workspace;

use anyhow::{Context as _, Result};
use declarative::{CancelToken, Context};
use provider::{TerraformConnector, WorkspaceManager};
use std::path::PathBuf;
use std::sync::Arc;
use tfkit::CliBackend;

use crate::config::Settings;
use crate::signal;

/// Settings plus the shared workspace manager, built once per invocation.
pub struct Runtime {
    pub settings: Settings,
    /// Settings file that was (or would have been) read
    pub config_path: PathBuf,
    pub quiet: bool,
    workspaces: Arc<WorkspaceManager>,
}

impl Runtime {
    pub fn new(settings: Settings, config_path: PathBuf, quiet: bool) -> Self {
        let workspaces = Arc::new(WorkspaceManager::new(settings.workspace_root()));
        Self {
            settings,
            config_path,
            quiet,
            workspaces,
        }
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Connector over the configured engine binary.
    pub fn connector(&self) -> Result<TerraformConnector> {
        let program = tfkit::find_engine(&self.settings.engine)
            .with_context(|| format!("Engine {:?} is not available", self.settings.engine))?;
        log::debug!("Using engine {}", program.display());

        let backend = CliBackend::new(self.settings.engine_config(program));
        Ok(TerraformConnector::new(
            Arc::clone(&self.workspaces),
            Arc::new(backend),
            self.settings.provider_options(),
        ))
    }

    /// Context cancelled on SIGINT/SIGTERM, bounded by the configured timeout.
    pub fn context(&self) -> Context {
        let token = CancelToken::new();
        signal::cancel_on_signal(token.clone());

        let ctx = Context::with_token(token);
        match self.settings.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }
}
