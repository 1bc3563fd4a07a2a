//! Lifecycle commands
//!
//! - `observe` / `create` / `update` / `delete` - one operation on one manifest
//! - `reconcile` - a full observe-then-converge pass over many manifests
//! - `render` - write engine inputs without running the engine

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{
    ConnectionDetails, Connector, Context, ExternalClient, Managed, Observation,
    ProgressCallback, ReconcileOptions, ReconcileReport, ReconcileSummary, reconcile_all,
};
use provider::{DesiredSpec, Identity, TerraformExternal, load_managed};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::Runtime;
use crate::cli::OutputArgs;
use crate::ui;

/// Converging operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converge {
    Create,
    Update,
}

impl Converge {
    fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
        }
    }
}

/// Attach the error kind to a provider error for the CLI.
fn explain(err: provider::Error) -> anyhow::Error {
    let summary = if err.is_transient() {
        format!("{} (retryable)", err.kind().description())
    } else {
        err.kind().description().to_string()
    };
    anyhow::Error::new(err).context(summary)
}

fn connect(
    rt: &Runtime,
    ctx: &Context,
    managed: &Managed<DesiredSpec>,
) -> Result<TerraformExternal> {
    rt.connector()?
        .connect(ctx, &managed.name)
        .map_err(explain)
}

fn disconnect(client: &TerraformExternal, ctx: &Context) {
    if let Err(e) = client.disconnect(ctx) {
        log::warn!("{}: disconnect failed: {}", client.workspace().identity(), e);
    }
}

pub fn observe(rt: &Runtime, manifest: &Path, output: OutputArgs) -> Result<()> {
    let managed = load_managed(manifest)?;
    let ctx = rt.context();
    let client = connect(rt, &ctx, &managed)?;

    let observation = client.observe(&ctx, &managed.spec).map_err(explain);
    disconnect(&client, &ctx);
    let observation = observation?;

    if output.json {
        print_json(&observation_json(&managed.name, &observation, output.reveal))?;
        return Ok(());
    }

    ui::header(&format!("Observe {}", managed.name));
    ui::kv("workspace", &client.workspace().path().display().to_string());
    ui::kv("exists", &ui::flag(observation.exists).to_string());
    ui::kv("up to date", &ui::flag(observation.up_to_date).to_string());
    ui::details(&observation.connection_details, output.reveal);
    Ok(())
}

pub fn converge(rt: &Runtime, manifest: &Path, op: Converge, output: OutputArgs) -> Result<()> {
    let managed = load_managed(manifest)?;
    let ctx = rt.context();
    let client = connect(rt, &ctx, &managed)?;

    let details = match op {
        Converge::Create => client.create(&ctx, &managed.spec),
        Converge::Update => client.update(&ctx, &managed.spec),
    }
    .map_err(explain);
    disconnect(&client, &ctx);
    let details = details?;

    if output.json {
        print_json(&json!({
            "name": managed.name,
            "outcome": op.past_tense(),
            "connection_details": details_json(&details, output.reveal),
        }))?;
        return Ok(());
    }

    ui::success(&format!("{} {}", managed.name.bold(), op.past_tense()));
    ui::details(&details, output.reveal);
    Ok(())
}

pub fn delete(rt: &Runtime, manifest: &Path, output: OutputArgs) -> Result<()> {
    let managed = load_managed(manifest)?;
    let ctx = rt.context();
    let client = connect(rt, &ctx, &managed)?;

    let result = client.delete(&ctx, &managed.spec).map_err(explain);
    disconnect(&client, &ctx);
    result?;

    if output.json {
        print_json(&json!({ "name": managed.name, "outcome": "deleted" }))?;
    } else {
        ui::success(&format!("{} deleted", managed.name.bold()));
    }
    Ok(())
}

pub fn reconcile(rt: &Runtime, manifests: &[PathBuf], jobs: usize, output: OutputArgs) -> Result<()> {
    let resources = manifests
        .iter()
        .map(|path| load_managed(path))
        .collect::<provider::Result<Vec<_>>>()?;
    if let Some(name) = duplicate_name(&resources) {
        bail!("Resource {name:?} appears more than once");
    }

    let connector = rt.connector()?;
    let ctx = rt.context();

    if !output.json && !rt.quiet {
        ui::header(&format!("Reconciling {} resource(s)", resources.len()));
    }

    let mut progress = StepProgress::new(!output.json);
    let reports = reconcile_all(
        &connector,
        &ctx,
        &resources,
        &ReconcileOptions { jobs },
        &mut progress,
    )?;
    let summary = ReconcileSummary::from_reports(&reports);

    if output.json {
        let reports: Vec<Value> = reports
            .iter()
            .map(|report| report_json(report, output.reveal))
            .collect();
        print_json(&json!({ "reports": reports, "summary": summary }))?;
    } else {
        for report in &reports {
            if !report.connection_details.is_empty() {
                ui::section(&report.name);
                for (name, value) in &report.connection_details {
                    ui::kv(name, &detail_text(value, output.reveal));
                }
            }
        }
        print_summary(&summary);
    }

    if !summary.is_success() {
        bail!("{} of {} resource(s) failed", summary.failed, summary.total());
    }
    Ok(())
}

pub fn render(rt: &Runtime, manifest: &Path) -> Result<()> {
    let managed = load_managed(manifest)?;
    let identity = Identity::new(managed.name.as_str())?;

    let workspace = rt.workspaces().ensure(&identity)?;
    provider::render(&workspace, &managed.spec)?;

    println!("{}", workspace.path().display());
    Ok(())
}

/// First name that occurs twice, if any.
fn duplicate_name<S>(resources: &[Managed<S>]) -> Option<&str> {
    let mut seen = HashSet::new();
    resources
        .iter()
        .map(|r| r.name.as_str())
        .find(|name| !seen.insert(*name))
}

/// Prints `[n/total] name outcome` as each resource finishes.
struct StepProgress {
    enabled: bool,
    total: usize,
    done: usize,
}

impl StepProgress {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            total: 0,
            done: 0,
        }
    }
}

impl ProgressCallback for StepProgress {
    fn on_batch_start(&mut self, count: usize) {
        self.total = count;
        self.done = 0;
    }

    fn on_resource_complete(&mut self, report: &ReconcileReport) {
        self.done += 1;
        if self.enabled {
            ui::step(
                self.done,
                self.total,
                &format!("{} {}", report.name.bold(), ui::outcome(&report.outcome)),
            );
        }
    }

    fn on_batch_complete(&mut self) {}
}

fn print_summary(summary: &ReconcileSummary) {
    ui::section("Summary");
    ui::kv("created", &summary.created.to_string());
    ui::kv("updated", &summary.updated.to_string());
    ui::kv("deleted", &summary.deleted.to_string());
    ui::kv("up to date", &summary.up_to_date.to_string());
    if summary.absent > 0 {
        ui::kv("absent", &summary.absent.to_string());
    }
    if summary.failed > 0 {
        ui::kv("failed", &summary.failed.to_string().red().to_string());
    } else {
        println!();
        ui::success("All resources reconciled");
    }
}

fn detail_text(value: &[u8], reveal: bool) -> String {
    if reveal {
        String::from_utf8_lossy(value).into_owned()
    } else {
        format!("<{}>", ui::byte_count(value.len()))
    }
}

/// Values when revealed, byte counts otherwise.
fn details_json(details: &ConnectionDetails, reveal: bool) -> Value {
    details
        .iter()
        .map(|(name, value)| {
            let value = if reveal {
                Value::String(String::from_utf8_lossy(value).into_owned())
            } else {
                json!(value.len())
            };
            (name.clone(), value)
        })
        .collect::<serde_json::Map<_, _>>()
        .into()
}

fn observation_json(name: &str, observation: &Observation, reveal: bool) -> Value {
    json!({
        "name": name,
        "exists": observation.exists,
        "up_to_date": observation.up_to_date,
        "connection_details": details_json(&observation.connection_details, reveal),
    })
}

fn report_json(report: &ReconcileReport, reveal: bool) -> Value {
    let mut value = json!({
        "name": report.name,
        "connection_details": details_json(&report.connection_details, reveal),
    });
    // Outcome is internally tagged; merge its fields in
    if let (Value::Object(map), Ok(Value::Object(outcome))) =
        (&mut value, serde_json::to_value(&report.outcome))
    {
        map.extend(outcome);
    }
    value
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
