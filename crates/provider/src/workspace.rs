//! Identity-keyed workspace directories.
//!
//! Every identity owns one directory under the configured root. The
//! directory is created owner-only and holds the rendered inputs plus
//! whatever the engine keeps locally (plugins, local state).

use crate::error::{Error, Result};
use crate::identity::Identity;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Primary configuration file
pub const PRIMARY_FILE: &str = "main.tf";
/// Backend declaration file
pub const BACKEND_FILE: &str = "backend.tf";
/// Variable definitions file
pub const VARIABLES_FILE: &str = "terraform.tfvars";
/// Module source declaration file
pub const MODULE_FILE: &str = "module.tf";

/// Files the provider renders, in display order.
pub const RENDERED_FILES: [&str; 4] = [PRIMARY_FILE, BACKEND_FILE, VARIABLES_FILE, MODULE_FILE];

/// One identity's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    identity: Identity,
    path: PathBuf,
}

impl Workspace {
    /// Identity owning this workspace.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// Creates and removes workspaces under a fixed root.
pub struct WorkspaceManager {
    root: PathBuf,
    locks: Mutex<HashMap<Identity, Arc<Mutex<()>>>>,
}

impl WorkspaceManager {
    /// Manager for workspaces under `root`. Nothing is created yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an identity maps to. Pure; touches nothing.
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.root.join(identity.dir_name())
    }

    /// Create the workspace if missing and return it.
    pub fn ensure(&self, identity: &Identity) -> Result<Workspace> {
        let lock = self.lock_for(identity);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.path_for(identity);
        let workspace_err = |source| Error::Workspace {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(|source| Error::Workspace {
            path: self.root.clone(),
            source,
        })?;

        match create_private_dir(&path) {
            Ok(()) => log::info!("created workspace {} for {}", path.display(), identity),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => {
                restrict_dir(&path).map_err(workspace_err)?;
            }
            Err(e) => return Err(workspace_err(e)),
        }

        Ok(Workspace {
            identity: identity.clone(),
            path,
        })
    }

    /// Look up an existing workspace without creating it.
    pub fn get(&self, identity: &Identity) -> Option<Workspace> {
        let path = self.path_for(identity);
        path.is_dir().then(|| Workspace {
            identity: identity.clone(),
            path,
        })
    }

    /// Remove the workspace recursively. A missing directory is not an error.
    pub fn teardown(&self, identity: &Identity) -> Result<()> {
        let lock = self.lock_for(identity);
        {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            let path = self.path_for(identity);

            match fs::remove_dir_all(&path) {
                Ok(()) => log::info!("removed workspace {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(Error::Workspace { path, source }),
            }
        }

        // Only forget the mutex when no other caller still holds a handle to it
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        if locks.get(identity).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(identity);
        }
        Ok(())
    }

    /// Workspaces currently present under the root, sorted by identity.
    ///
    /// A missing root yields an empty list.
    pub fn list(&self) -> Result<Vec<Workspace>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(Error::Workspace {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut workspaces: Vec<Workspace> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name();
                let identity = Identity::from_dir_name(name.to_str()?)?;
                Some(Workspace {
                    identity,
                    path: entry.path(),
                })
            })
            .collect();

        workspaces.sort_by(|a, b| a.identity.cmp(&b.identity));
        Ok(workspaces)
    }

    fn lock_for(&self, identity: &Identity) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(identity.clone()).or_default())
    }
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().mode(0o700).create(path)?;
    // The umask may have narrowed the mode; make it exact
    restrict_dir(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::create_dir(path)
}

#[cfg(unix)]
fn restrict_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
