//! Desired state of a Terraform resource.
//!
//! Field names follow the manifest format (`configuration`, `variables`,
//! `backend.type`, `workspace`, `source`), so a spec can be read straight
//! from YAML, JSON or TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource kind handled by this provider.
pub const KIND: &str = "Terraform";

/// Engine workspace used when the spec names none.
pub const DEFAULT_WORKSPACE: &str = "default";

/// What the engine should converge to.
///
/// Owned by the caller; lifecycle operations only read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredSpec {
    /// Primary configuration, written verbatim
    #[serde(with = "configuration_text")]
    pub configuration: Vec<u8>,

    /// Input variables
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,

    /// State backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendSpec>,

    /// Engine workspace to select (created when missing)
    #[serde(default, rename = "workspace", skip_serializing_if = "Option::is_none")]
    pub workspace_name: Option<String>,

    /// Module the configuration is built from
    #[serde(default, rename = "source", skip_serializing_if = "Option::is_none")]
    pub module_source: Option<ModuleSource>,
}

impl DesiredSpec {
    /// Spec with only a primary configuration.
    pub fn new(configuration: impl Into<Vec<u8>>) -> Self {
        Self {
            configuration: configuration.into(),
            ..Default::default()
        }
    }

    /// Add an input variable.
    #[must_use]
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Set the state backend.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendSpec) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the engine workspace.
    #[must_use]
    pub fn with_workspace(mut self, name: impl Into<String>) -> Self {
        self.workspace_name = Some(name.into());
        self
    }

    /// Set the module source.
    #[must_use]
    pub fn with_module_source(mut self, source: ModuleSource) -> Self {
        self.module_source = Some(source);
        self
    }

    /// Engine workspace every session switches to.
    ///
    /// The engine remembers its selection inside the working directory, so a
    /// spec that drops its workspace name must move back to the default one.
    pub fn selected_workspace(&self) -> &str {
        self.workspace_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_WORKSPACE)
    }
}

/// Backend block: `backend "<kind>" { key = "value" ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSpec {
    /// Backend type, e.g. `s3`, `gcs`, `local`
    #[serde(rename = "type")]
    pub kind: String,

    /// Backend settings
    #[serde(default, rename = "configuration", skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, String>,
}

impl BackendSpec {
    /// Backend of `kind` with no settings.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Add a backend setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// Where the module comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSource {
    /// Local directory
    Path(String),
    /// Git repository
    Git(GitSource),
    /// HTTP archive
    Http(HttpSource),
}

/// Module in a Git repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSource {
    /// Repository URL
    pub url: String,
    /// Branch, tag or commit
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Subdirectory within the repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Module served over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSource {
    /// Archive URL
    pub url: String,
    /// Expected checksum, e.g. `sha256:...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// How `observe` decides whether an existing resource is up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservePolicy {
    /// Existing state counts as up to date
    #[default]
    Existence,
    /// Existing state is up to date only if a plan reports no changes
    Plan,
}

/// Provider-wide behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOptions {
    /// Up-to-date policy for `observe`
    pub observe_policy: ObservePolicy,
}

/// Primary configuration is text in manifests, bytes in memory.
mod configuration_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(String::deserialize(deserializer)?.into_bytes())
    }
}
