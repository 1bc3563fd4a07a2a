use anyhow::{Result, bail};
use colored::Colorize;
use provider::ObservePolicy;
use std::fs;
use std::path::Path;
use std::process::Command;

use super::Runtime;
use crate::config::Settings;
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    fix: Option<String>,
}

pub fn run(rt: &Runtime) -> Result<()> {
    ui::header("tfreconcile health check");

    let mut issues: Vec<Issue> = Vec::new();

    check_settings(rt, &mut issues);
    check_engine(&rt.settings, &mut issues);
    check_workspace_root(rt, &mut issues);

    println!();
    if issues.is_empty() {
        ui::success("Ready to reconcile");
        return Ok(());
    }

    print_issue_summary(&issues);
    bail!("{} issue(s) found", issues.len())
}

fn print_issue_summary(issues: &[Issue]) {
    ui::section("Issues");
    for (i, issue) in issues.iter().enumerate() {
        println!(
            "  {}  {} {}",
            format!("{}.", i + 1).bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
    }
}

fn check_settings(rt: &Runtime, issues: &mut Vec<Issue>) {
    ui::section("Settings");

    let path = &rt.config_path;
    if path.exists() {
        println!("  {} {}", "✓".green(), path.display());
    } else {
        println!(
            "  {} {} {}",
            "○".dimmed(),
            path.display(),
            "(not found, using defaults)".dimmed()
        );
    }

    let settings = &rt.settings;
    let policy = match settings.observe_policy {
        ObservePolicy::Existence => "existence",
        ObservePolicy::Plan => "plan",
    };
    ui::kv("observe policy", policy);
    ui::kv(
        "timeout",
        &settings
            .timeout_secs
            .map_or_else(|| "none".to_string(), |s| format!("{s}s")),
    );
    if settings.timeout_secs == Some(0) {
        issues.push(Issue {
            category: "Settings",
            summary: "timeout_secs is 0, every command will time out immediately".into(),
            fix: Some(format!("Raise or remove timeout_secs in {}", path.display())),
        });
    }
}

fn check_engine(settings: &Settings, issues: &mut Vec<Issue>) {
    ui::section("Engine");

    let program = match tfkit::find_engine(&settings.engine) {
        Ok(program) => program,
        Err(e) => {
            println!("  {} {} {}", "✗".red(), settings.engine, "(missing)".red());
            issues.push(Issue {
                category: "Engine",
                summary: e.to_string(),
                fix: Some(e.category().advice().to_string()),
            });
            return;
        }
    };

    let version = engine_version(&program).unwrap_or_else(|| "version unknown".to_string());
    println!("  {} {} - {}", "✓".green(), program.display(), version.dimmed());
}

/// First line of `<engine> version`.
fn engine_version(program: &Path) -> Option<String> {
    let output = Command::new(program)
        .arg("version")
        .env("TF_IN_AUTOMATION", "1")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
}

fn check_workspace_root(rt: &Runtime, issues: &mut Vec<Issue>) {
    ui::section("Workspace root");

    let root = rt.workspaces().root();
    if let Err(e) = probe_writable(root) {
        println!("  {} {} {}", "✗".red(), root.display(), "(not writable)".red());
        issues.push(Issue {
            category: "Workspace root",
            summary: format!("Cannot write to {}: {e}", root.display()),
            fix: Some("Set workspace_root or TFRECONCILE_WORKSPACE_ROOT to a writable directory".into()),
        });
        return;
    }
    println!("  {} {}", "✓".green(), root.display());

    match rt.workspaces().list() {
        Ok(workspaces) => ui::kv("workspaces", &workspaces.len().to_string()),
        Err(e) => ui::warn(&format!("Could not list workspaces: {e}")),
    }
}

/// Create the root if needed and check a file can be written in it.
fn probe_writable(root: &Path) -> std::io::Result<()> {
    fs::create_dir_all(root)?;
    let probe = root.join(".tfreconcile-probe");
    fs::write(&probe, b"")?;
    fs::remove_file(&probe)
}
