//! Resource manifests: `{kind, name, deleting, spec}` documents.
//!
//! The spec stays untyped until the kind is checked, so a manifest for some
//! other provider is rejected with a type mismatch instead of a confusing
//! parse error.

use crate::error::{Error, Result};
use crate::spec::{DesiredSpec, KIND};
use declarative::Managed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File format of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl Format {
    /// Format for a file, by extension. Unknown extensions are read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// A resource document as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Resource kind; must be `Terraform`
    pub kind: String,
    /// Identity of the resource
    pub name: String,
    /// Marked for deletion
    #[serde(default)]
    pub deleting: bool,
    /// Kind-specific desired state
    pub spec: serde_json::Value,
}

impl Manifest {
    /// Read a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&text, Format::from_path(path)).map_err(|message| Error::Manifest {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse manifest text.
    pub fn parse(text: &str, format: Format) -> std::result::Result<Self, String> {
        match format {
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        }
    }

    /// Check the kind and decode the spec.
    pub fn into_managed(self) -> Result<Managed<DesiredSpec>> {
        if self.kind != KIND {
            return Err(Error::TypeMismatch {
                expected: KIND,
                found: self.kind,
            });
        }

        let spec: DesiredSpec = serde_json::from_value(self.spec).map_err(|e| Error::Manifest {
            path: self.name.clone().into(),
            message: format!("spec: {e}"),
        })?;

        Ok(Managed {
            name: self.name,
            deleting: self.deleting,
            spec,
        })
    }
}

/// Load a manifest file and check its kind.
pub fn load_managed(path: &Path) -> Result<Managed<DesiredSpec>> {
    Manifest::load(path)?.into_managed().map_err(|e| match e {
        Error::Manifest { message, .. } => Error::Manifest {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}
