use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;

use constants::env_vars::EnvVars;

use maxpar::config::{read_config, CONFIG_FILE};
use maxpar::fs::{config_dir, Simplified};
use maxpar::system::TaskSystem;

mod deps;
mod graph;
mod par_cost;
mod reporter;
mod run;
mod sample_config;
mod validate;

pub(crate) use deps::{deps, order};
pub(crate) use graph::graph;
pub(crate) use par_cost::par_cost;
pub(crate) use run::run;
pub(crate) use sample_config::sample_config;
pub(crate) use validate::validate;

#[derive(Copy, Clone)]
pub(crate) enum ExitStatus {
    /// The command succeeded.
    Success,

    /// The command failed due to an error in the user input or a failing task.
    Failure,

    /// The command failed with an unexpected error.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Failure => Self::from(1),
            ExitStatus::Error => Self::from(2),
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub(crate) enum ColorChoice {
    /// Enables colored output only when the output is going to a terminal or TTY with support.
    Auto,
    /// Enables colored output regardless of the detected environment.
    Always,
    /// Disables colored output.
    Never,
}

impl From<ColorChoice> for anstream::ColorChoice {
    fn from(value: ColorChoice) -> Self {
        match value {
            ColorChoice::Auto => Self::Auto,
            ColorChoice::Always => Self::Always,
            ColorChoice::Never => Self::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "maxpar", version, about = "Run task systems with maximal parallelism")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,

    #[command(flatten)]
    pub(crate) globals: GlobalArgs,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Global options")]
pub(crate) struct GlobalArgs {
    /// Path to the task system file.
    #[arg(global = true, short, long, env = EnvVars::MAXPAR_CONFIG)]
    pub(crate) config: Option<PathBuf>,

    /// Whether to use color in output.
    #[arg(global = true, long, value_enum, default_value_t = ColorChoice::Auto)]
    pub(crate) color: ColorChoice,

    /// Hide progress outputs.
    #[arg(global = true, long)]
    pub(crate) no_progress: bool,

    /// Do not print any output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    pub(crate) quiet: bool,

    /// Use verbose output.
    #[arg(global = true, short, long, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run all tasks.
    Run(RunArgs),
    /// Run all tasks sequentially, then in parallel, and compare the timings.
    ParCost(JobsArgs),
    /// List the tasks that must complete before a task can start.
    Deps(DepsArgs),
    /// Print the sequential execution order.
    Order,
    /// Print the precedence graph in Graphviz DOT format.
    Graph(GraphArgs),
    /// Validate the task system file.
    Validate,
    /// Produce a sample `maxpar.yaml` file.
    SampleConfig(SampleConfigArgs),
}

#[derive(Args, Debug)]
pub(crate) struct JobsArgs {
    /// Maximum number of tasks running at the same time. Unbounded by default.
    #[arg(short, long, env = EnvVars::MAXPAR_JOBS)]
    pub(crate) jobs: Option<NonZeroUsize>,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Run tasks one after the other instead of in parallel.
    #[arg(long)]
    pub(crate) seq: bool,

    #[command(flatten)]
    pub(crate) jobs: JobsArgs,
}

#[derive(Args, Debug)]
pub(crate) struct DepsArgs {
    /// The task to inspect.
    #[arg(value_name = "TASK")]
    pub(crate) task: String,
}

#[derive(Args, Debug)]
pub(crate) struct GraphArgs {
    /// Write the graph to a file instead of stdout.
    #[arg(short, long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SampleConfigArgs {
    /// Write the sample config to a file (`maxpar.yaml` by default).
    #[arg(
        short,
        long,
        num_args = 0..=1,
        default_missing_value = CONFIG_FILE,
    )]
    pub(crate) file: Option<PathBuf>,
}

/// Load and validate the task system described by `config`, or by `maxpar.yaml`.
pub(crate) fn load_system(config: Option<PathBuf>) -> Result<TaskSystem> {
    let path = config.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    if !path.try_exists()? {
        anyhow::bail!("Task system file not found: `{}`", path.user_display().cyan());
    }

    let system = read_config(&path)?
        .into_system()
        .with_context(|| format!("Invalid task system in `{}`", path.user_display()))?;
    Ok(system.with_workdir(config_dir(&path)))
}
