// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `forge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "forge",
    version,
    about = "Schedule work-graph items, run verification gates and track worker sessions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Forge.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Forge.toml", global = true)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check the requirement graph for cycles, dangling edges, unknown
    /// groups, orphans and file conflicts.
    Validate(GraphArgs),

    /// List pending requirements whose dependencies are all complete.
    Ready(GraphArgs),

    /// List pending requirements and what blocks them.
    Blocked(GraphArgs),

    /// Pack ready requirements into file-conflict-free waves.
    Waves(GraphArgs),

    /// Per-group status counts.
    Status(GraphArgs),

    /// Milestone execution waves and the milestones ready to start.
    Milestones(MilestoneArgs),

    /// Run the configured verification gates.
    Verify(VerifyArgs),

    /// Inspect or sweep the session registry.
    Sessions(SessionArgs),
}

#[derive(Debug, Clone, Args)]
pub struct GraphArgs {
    /// Graph index (JSON).
    #[arg(long, value_name = "PATH", default_value = "graph.json")]
    pub graph: PathBuf,

    /// Requirement detail records (JSON array).
    #[arg(long, value_name = "PATH")]
    pub details: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct MilestoneArgs {
    /// Milestone list (JSON array of `{number, name, depends_on}`).
    #[arg(long, value_name = "PATH", default_value = "milestones.json")]
    pub file: PathBuf,

    /// Milestone numbers already complete.
    #[arg(long, value_delimiter = ',', value_name = "N,...")]
    pub completed: Vec<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Directory the gates run in.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Retry counter recorded in the result.
    #[arg(long, default_value_t = 1)]
    pub iteration: u32,

    /// Gates to run, in order. Default: `[pipeline].order`, or every
    /// configured gate by name.
    #[arg(value_name = "GATE")]
    pub gates: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct SessionArgs {
    /// Repository root holding `.forge/sessions.json`.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo: PathBuf,

    #[command(subcommand)]
    pub action: SessionAction,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum SessionAction {
    /// Print every registered session.
    List,
    /// Mark sessions whose process is gone as stale.
    Stale,
    /// Remove stale sessions.
    Prune,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
