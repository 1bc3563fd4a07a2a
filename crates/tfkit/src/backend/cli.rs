//! Real engine backend executing `terraform` subcommands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::process::{self, Interrupt};
use crate::types::{CommandOutput, EngineConfig, Phase, ShowResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Exit code of `plan -detailed-exitcode` when the plan has changes.
const PLAN_HAS_CHANGES: i32 = 2;

/// Backend that executes the engine binary.
pub struct CliBackend {
    config: EngineConfig,
}

impl CliBackend {
    /// Create a backend for an explicit engine configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Create a backend for `name`, resolved through `PATH`.
    pub fn discover(name: &str) -> Result<Self> {
        let program = crate::find_engine(name)?;
        Ok(Self::new(EngineConfig::new(program)))
    }

    /// The configuration this backend runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a command for the engine in `dir`.
    fn command(&self, dir: &Path, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .envs(&self.config.env);
        cmd
    }

    /// Run an engine command and return its output, whatever the exit code.
    fn run_engine(
        &self,
        phase: Phase,
        dir: &Path,
        args: &[String],
        interrupt: &dyn Interrupt,
    ) -> Result<CommandOutput> {
        process::run(phase, self.command(dir, args), interrupt)
    }

    /// Run an engine command and check for success.
    fn run_engine_checked(
        &self,
        phase: Phase,
        dir: &Path,
        args: &[String],
        interrupt: &dyn Interrupt,
    ) -> Result<CommandOutput> {
        let output = self.run_engine(phase, dir, args, interrupt)?;

        if !output.success() {
            return Err(Error::from_engine_output(
                phase,
                output.code,
                &output.stderr_str(),
            ));
        }

        Ok(output)
    }

    /// Flags shared by plan/apply/destroy.
    fn mutation_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if let Some(n) = self.config.parallelism {
            flags.push(format!("-parallelism={n}"));
        }
        if let Some(refresh) = self.config.refresh {
            flags.push(format!("-refresh={refresh}"));
        }
        flags
    }
}

impl Backend for CliBackend {
    fn init(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        self.run_engine_checked(Phase::Init, dir, &args(&["init", "-input=false", "-no-color"]), interrupt)?;
        Ok(())
    }

    fn select_workspace(&self, dir: &Path, name: &str, interrupt: &dyn Interrupt) -> Result<()> {
        let output = self.run_engine(
            Phase::Workspace,
            dir,
            &args(&["workspace", "select", name]),
            interrupt,
        )?;
        if output.success() {
            return Ok(());
        }

        let stderr = output.stderr_str();
        if !is_missing_workspace(&stderr) {
            return Err(Error::from_engine_output(Phase::Workspace, output.code, &stderr));
        }

        log::info!("creating engine workspace {name} in {}", dir.display());
        self.run_engine_checked(
            Phase::Workspace,
            dir,
            &args(&["workspace", "new", name]),
            interrupt,
        )?;
        Ok(())
    }

    fn plan(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<bool> {
        let mut argv = args(&["plan", "-input=false", "-no-color", "-detailed-exitcode"]);
        argv.extend(self.mutation_flags());

        let output = self.run_engine(Phase::Plan, dir, &argv, interrupt)?;
        match output.code {
            Some(0) => Ok(false),
            Some(PLAN_HAS_CHANGES) => Ok(true),
            code => Err(Error::from_engine_output(Phase::Plan, code, &output.stderr_str())),
        }
    }

    fn apply(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        let mut argv = args(&["apply", "-input=false", "-no-color", "-auto-approve"]);
        argv.extend(self.mutation_flags());
        self.run_engine_checked(Phase::Apply, dir, &argv, interrupt)?;
        Ok(())
    }

    fn destroy(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<()> {
        let mut argv = args(&["destroy", "-input=false", "-no-color", "-auto-approve"]);
        argv.extend(self.mutation_flags());
        self.run_engine_checked(Phase::Destroy, dir, &argv, interrupt)?;
        Ok(())
    }

    fn show(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<ShowResult> {
        let output =
            self.run_engine_checked(Phase::Show, dir, &args(&["show", "-json", "-no-color"]), interrupt)?;
        parse_show(&output.stdout)
    }

    fn output(&self, dir: &Path, interrupt: &dyn Interrupt) -> Result<BTreeMap<String, String>> {
        let output = self.run_engine_checked(
            Phase::Output,
            dir,
            &args(&["output", "-json", "-no-color"]),
            interrupt,
        )?;
        parse_outputs(&output.stdout)
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn is_missing_workspace(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("doesn't exist") || lower.contains("does not exist")
}

/// Parse `show -json` output.
///
/// A state exists only when the document carries a `values` object; an empty
/// document or one with only `format_version` means nothing was created yet.
fn parse_show(stdout: &[u8]) -> Result<ShowResult> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(ShowResult::empty());
    }

    let json: serde_json::Value = serde_json::from_slice(stdout).map_err(|e| Error::Parse {
        phase: Phase::Show,
        message: e.to_string(),
    })?;

    let Some(values) = json.get("values").filter(|v| v.is_object()) else {
        return Ok(ShowResult::empty());
    };

    let outputs = values
        .get("outputs")
        .and_then(|o| o.as_object())
        .map(|map| {
            map.iter()
                .filter_map(|(name, out)| out.get("value").map(|v| (name.clone(), value_to_string(v))))
                .collect()
        })
        .unwrap_or_default();

    Ok(ShowResult {
        state_exists: true,
        outputs,
    })
}

/// Parse `output -json` output into name → rendered value.
fn parse_outputs(stdout: &[u8]) -> Result<BTreeMap<String, String>> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    let json: serde_json::Value = serde_json::from_slice(stdout).map_err(|e| Error::Parse {
        phase: Phase::Output,
        message: e.to_string(),
    })?;

    let map = json.as_object().ok_or_else(|| Error::Parse {
        phase: Phase::Output,
        message: "expected a JSON object".to_string(),
    })?;

    Ok(map
        .iter()
        .filter_map(|(name, out)| out.get("value").map(|v| (name.clone(), value_to_string(v))))
        .collect())
}

/// Strings verbatim, everything else JSON-encoded.
fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve an engine name or path to an executable.
pub(crate) fn resolve(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::EngineNotFound {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_show_without_state() {
        assert!(!parse_show(b"").unwrap().state_exists);
        assert!(!parse_show(b"{\"format_version\":\"1.0\"}\n").unwrap().state_exists);
        assert!(
            !parse_show(b"{\"format_version\":\"1.0\",\"values\":null}")
                .unwrap()
                .state_exists
        );
    }

    #[test]
    fn test_parse_show_with_state_and_outputs() {
        let doc = br#"{
            "format_version": "1.0",
            "values": {
                "outputs": {
                    "bucket": {"sensitive": false, "value": "my-bucket", "type": "string"},
                    "ports": {"sensitive": false, "value": [80, 443]}
                },
                "root_module": {}
            }
        }"#;
        let show = parse_show(doc).unwrap();

        assert!(show.state_exists);
        assert_eq!(show.outputs["bucket"], "my-bucket");
        assert_eq!(show.outputs["ports"], "[80,443]");
    }

    #[test]
    fn test_parse_show_invalid_json() {
        let err = parse_show(b"not json").unwrap_err();
        assert!(matches!(err, Error::Parse { phase: Phase::Show, .. }));
    }

    #[test]
    fn test_parse_outputs() {
        let doc = br#"{"endpoint": {"sensitive": true, "type": "string", "value": "db.internal:5432"}}"#;
        let outputs = parse_outputs(doc).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs["endpoint"], "db.internal:5432");

        assert!(parse_outputs(b"{}").unwrap().is_empty());
        assert!(parse_outputs(b"\n").unwrap().is_empty());
        assert!(parse_outputs(b"[]").is_err());
    }

    #[test]
    fn test_mutation_flags() {
        let mut config = EngineConfig::new("terraform");
        assert!(CliBackend::new(config.clone()).mutation_flags().is_empty());

        config.parallelism = Some(4);
        config.refresh = Some(false);
        assert_eq!(
            CliBackend::new(config).mutation_flags(),
            vec!["-parallelism=4", "-refresh=false"]
        );
    }

    #[test]
    fn test_is_missing_workspace() {
        assert!(is_missing_workspace("Workspace \"staging\" doesn't exist.\n"));
        assert!(!is_missing_workspace("Error: backend unreachable"));
    }
}
