//! Render a [`DesiredSpec`] into engine input files.
//!
//! Every file is rewritten whole on each call. Optional files whose spec
//! field is absent are removed, so a file's presence always means the
//! corresponding setting is configured.

use crate::error::{Error, Result};
use crate::spec::{DesiredSpec, ModuleSource};
use crate::workspace::{BACKEND_FILE, MODULE_FILE, PRIMARY_FILE, VARIABLES_FILE, Workspace};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

/// Write all input files for `spec` into `workspace`.
pub fn render(workspace: &Workspace, spec: &DesiredSpec) -> Result<()> {
    write_private(&workspace.file(PRIMARY_FILE), &spec.configuration)?;

    match &spec.backend {
        Some(backend) => {
            let text = render_backend(&backend.kind, &backend.settings)?;
            write_private(&workspace.file(BACKEND_FILE), text.as_bytes())?;
        }
        None => remove_stale(&workspace.file(BACKEND_FILE))?,
    }

    if spec.variables.is_empty() {
        remove_stale(&workspace.file(VARIABLES_FILE))?;
    } else {
        let text = render_assignments("variable", &spec.variables)?;
        write_private(&workspace.file(VARIABLES_FILE), text.as_bytes())?;
    }

    match &spec.module_source {
        Some(source) => {
            write_private(&workspace.file(MODULE_FILE), render_module(source).as_bytes())?;
        }
        None => remove_stale(&workspace.file(MODULE_FILE))?,
    }

    log::debug!("rendered inputs into {}", workspace.path().display());
    Ok(())
}

/// Backend declaration:
///
/// ```text
/// terraform {
///   backend "s3" {
///     bucket = "x"
///   }
/// }
/// ```
pub fn render_backend(kind: &str, settings: &BTreeMap<String, String>) -> Result<String> {
    check_key("backend", kind)?;

    let mut out = String::new();
    out.push_str("terraform {\n");
    let _ = writeln!(out, "  backend \"{kind}\" {{");
    for (key, value) in settings {
        check_key("backend", key)?;
        let _ = writeln!(out, "    {key} = \"{}\"", escape(value));
    }
    out.push_str("  }\n}\n");
    Ok(out)
}

/// One `key = "value"` line per entry.
pub fn render_assignments(context: &'static str, values: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::new();
    for (key, value) in values {
        check_key(context, key)?;
        let _ = writeln!(out, "{key} = \"{}\"", escape(value));
    }
    Ok(out)
}

/// Module block pointing at the module source.
pub fn render_module(source: &ModuleSource) -> String {
    format!(
        "module \"source\" {{\n  source = \"{}\"\n}}\n",
        escape(&module_address(source))
    )
}

/// Source address understood by the engine's module installer.
pub fn module_address(source: &ModuleSource) -> String {
    match source {
        ModuleSource::Path(path) => path.clone(),
        ModuleSource::Git(git) => {
            let mut address = format!("git::{}", git.url);
            if let Some(path) = git.path.as_deref().filter(|p| !p.is_empty()) {
                let _ = write!(address, "//{}", path.trim_start_matches('/'));
            }
            if let Some(reference) = git.reference.as_deref().filter(|r| !r.is_empty()) {
                let _ = write!(address, "?ref={reference}");
            }
            address
        }
        ModuleSource::Http(http) => match http.checksum.as_deref().filter(|c| !c.is_empty()) {
            Some(checksum) => {
                let separator = if http.url.contains('?') { '&' } else { '?' };
                format!("{}{separator}checksum={checksum}", http.url)
            }
            None => http.url.clone(),
        },
    }
}

/// Escape a value for a double-quoted string.
///
/// Template sequences are doubled so values are taken literally.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape`].
pub fn unescape(value: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => return Err(format!("unknown escape \\{other}")),
                None => return Err("dangling backslash".to_string()),
            },
            '"' => return Err("unescaped quote".to_string()),
            '$' | '%' => {
                // `$${` is a literal `${`
                let mut lookahead = chars.clone();
                if lookahead.next() == Some(c) && lookahead.next() == Some('{') {
                    chars.next();
                }
                out.push(c);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// Parse `key = "value"` lines as written by [`render_assignments`].
///
/// Blank lines and `#` comments are skipped.
pub fn parse_assignments(text: &str) -> Result<BTreeMap<String, String>> {
    let mut values = BTreeMap::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_err = |message: String| Error::Parse {
            line: index + 1,
            message,
        };

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| parse_err("expected key = \"value\"".to_string()))?;
        let key = key.trim();
        if !is_identifier(key) {
            return Err(parse_err(format!("invalid key {key:?}")));
        }

        let quoted = value.trim();
        let inner = quoted
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .filter(|_| quoted.len() >= 2)
            .ok_or_else(|| parse_err("value must be a quoted string".to_string()))?;

        values.insert(key.to_string(), unescape(inner).map_err(parse_err)?);
    }
    Ok(values)
}

fn check_key(context: &'static str, key: &str) -> Result<()> {
    if is_identifier(key) {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            context,
            key: key.to_string(),
        })
    }
}

/// `[A-Za-z_][A-Za-z0-9_-]*`
fn is_identifier(key: &str) -> bool {
    let mut bytes = key.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Whole-file write, owner read/write only.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let write = || -> io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(contents)?;

        // Pre-existing files keep their mode on open; reset it
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    };

    write().map_err(|source| Error::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Serialization {
            path: path.to_path_buf(),
            source,
        }),
    }
}
