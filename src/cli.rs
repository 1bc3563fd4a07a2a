use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tfreconcile")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile Terraform configurations against the real world", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: <config dir>/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Root directory holding one workspace per resource
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace_root: Option<String>,

    /// Engine binary name or path
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub engine: Option<String>,

    /// Deadline in seconds for the whole command
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report whether the resource exists and is up to date
    Observe(ResourceArgs),

    /// Bring the resource into existence
    Create(ResourceArgs),

    /// Converge an existing resource to its manifest
    Update(ResourceArgs),

    /// Destroy the resource and drop its workspace
    Delete(ResourceArgs),

    /// Run one observe/create/update/delete pass per manifest
    Reconcile(ReconcileArgs),

    /// Write the engine inputs without running the engine
    Render {
        /// Resource manifest (YAML, JSON or TOML)
        manifest: PathBuf,
    },

    /// Show the rendered inputs of a workspace
    Inspect {
        /// Resource name
        name: String,
    },

    /// List workspaces under the workspace root
    Workspaces,

    /// Check the engine binary and workspace root
    Doctor,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ResourceArgs {
    /// Resource manifest (YAML, JSON or TOML)
    pub manifest: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// Resource manifests (YAML, JSON or TOML)
    #[arg(required = true)]
    pub manifests: Vec<PathBuf>,

    /// Resources reconciled in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,

    /// Print connection detail values instead of their sizes
    #[arg(long)]
    pub reveal: bool,
}
