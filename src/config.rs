//! Settings file and environment overrides.
//!
//! ```toml
//! workspace_root = "~/.cache/tfreconcile"
//! engine = "tofu"
//! timeout_secs = 1800
//! observe_policy = "plan"
//! parallelism = 4
//! refresh = true
//!
//! [environment]
//! TF_PLUGIN_CACHE_DIR = "/var/cache/terraform"
//! ```

use anyhow::{Context, Result};
use provider::{ObservePolicy, ProviderOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tfkit::EngineConfig;

use crate::paths;

/// Overrides `workspace_root`
pub const ENV_WORKSPACE_ROOT: &str = "TFRECONCILE_WORKSPACE_ROOT";
/// Overrides `engine`
pub const ENV_ENGINE: &str = "TFRECONCILE_ENGINE";
/// Overrides `timeout_secs`
pub const ENV_TIMEOUT: &str = "TFRECONCILE_TIMEOUT";

const DEFAULT_ENGINE: &str = "terraform";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Root for per-resource workspaces; `~` and `$VARS` are expanded
    pub workspace_root: Option<String>,
    /// Engine binary name or path
    pub engine: String,
    /// Deadline for a whole command
    pub timeout_secs: Option<u64>,
    pub observe_policy: ObservePolicy,
    pub parallelism: Option<u32>,
    pub refresh: Option<bool>,
    /// Extra environment for every engine invocation
    pub environment: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace_root: None,
            engine: DEFAULT_ENGINE.to_string(),
            timeout_secs: None,
            observe_policy: ObservePolicy::default(),
            parallelism: None,
            refresh: None,
            environment: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings and apply environment overrides.
    ///
    /// An explicit path must exist; the default location may be missing, in
    /// which case defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = match explicit {
            Some(path) => Self::read(path)?,
            None => {
                let path = paths::config_file()?;
                match Self::read(&path) {
                    Ok(settings) => settings,
                    Err(e) if is_not_found(&e) => {
                        log::debug!("No settings at {}, using defaults", path.display());
                        Self::default()
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Parse settings from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `TFRECONCILE_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_WORKSPACE_ROOT) {
            self.workspace_root = Some(root);
        }
        if let Some(engine) = lookup(ENV_ENGINE) {
            self.engine = engine;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            let secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT} must be a number of seconds, got {timeout:?}"))?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }

    /// Resolved workspace root.
    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .as_deref()
            .map_or_else(paths::default_workspace_root, paths::expand)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            observe_policy: self.observe_policy,
        }
    }

    /// Engine invocation settings for a resolved engine program.
    pub fn engine_config(&self, program: PathBuf) -> EngineConfig {
        let mut config = self
            .environment
            .iter()
            .fold(EngineConfig::new(program), |config, (key, value)| {
                config.with_env(key, value)
            });
        config.parallelism = self.parallelism;
        config.refresh = self.refresh;
        config
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
