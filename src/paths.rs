//! Path resolution for tfreconcile
//!
//! # Environment Variables
//!
//! - `TFRECONCILE_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `TFRECONCILE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/tfreconcile` (if set)
//! 3. `~/.config/tfreconcile`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "TFRECONCILE_CONFIG_DIR";

const APP_DIR: &str = "tfreconcile";

/// Settings file name inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default settings file location.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Workspace root used when none is configured.
pub fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join(APP_DIR)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set, restoring the previous value afterwards.
    ///
    /// Tests touching `ENV_CONFIG_DIR` all live in this module and hold
    /// `ENV_LOCK` so they never race each other.
    fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let original = env::var(key).ok();
        // SAFETY: env access in this module is serialized by ENV_LOCK
        match value {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        let result = f();
        match original {
            // SAFETY: as above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, Some("/custom/config/path"), || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/config/path"));
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/config/path/config.toml")
            );
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, Some("~/dotfiles/tfreconcile"), || {
            assert_eq!(
                config_dir().unwrap(),
                home.join("dotfiles").join("tfreconcile")
            );
        });
    }

    #[test]
    fn test_default_workspace_root_is_under_temp() {
        let root = default_workspace_root();
        assert!(root.starts_with(env::temp_dir()));
        assert!(root.ends_with("tfreconcile"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/test/path"), home.join("test").join("path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_TFRECONCILE_VAR/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_TFRECONCILE_VAR/file")
        );
    }
}
