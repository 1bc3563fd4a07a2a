mod cli;
mod commands;
mod config;
mod paths;
mod signal;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use commands::Runtime;
use commands::lifecycle::{self, Converge};
use config::Settings;
use std::io;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "tfreconcile", &mut io::stdout());
        return Ok(());
    }

    let rt = runtime(&cli)?;

    match cli.command {
        Command::Observe(args) => lifecycle::observe(&rt, &args.manifest, args.output),
        Command::Create(args) => {
            lifecycle::converge(&rt, &args.manifest, Converge::Create, args.output)
        }
        Command::Update(args) => {
            lifecycle::converge(&rt, &args.manifest, Converge::Update, args.output)
        }
        Command::Delete(args) => lifecycle::delete(&rt, &args.manifest, args.output),
        Command::Reconcile(args) => {
            lifecycle::reconcile(&rt, &args.manifests, args.jobs, args.output)
        }
        Command::Render { manifest } => lifecycle::render(&rt, &manifest),
        Command::Inspect { name } => commands::workspace::inspect(&rt, &name),
        Command::Workspaces => commands::workspace::list(&rt),
        Command::Doctor => commands::doctor::run(&rt),
        Command::Completions { .. } => Ok(()),
    }
}

/// Settings file, then environment, then command-line flags.
fn runtime(cli: &Cli) -> Result<Runtime> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    if let Some(root) = &cli.workspace_root {
        settings.workspace_root = Some(root.clone());
    }
    if let Some(engine) = &cli.engine {
        settings.engine = engine.clone();
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = Some(timeout);
    }

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => paths::config_file()?,
    };
    Ok(Runtime::new(settings, config_path, cli.quiet))
}
