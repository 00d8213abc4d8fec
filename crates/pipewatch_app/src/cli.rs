use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pipewatch_core::{RunType, StartForm};

#[derive(Debug, Parser)]
#[command(
    name = "pipewatch",
    version,
    about = "Start, stop and follow a remote pipeline job"
)]
pub struct Cli {
    #[arg(long, help = "Path to config file (default: <config dir>/pipewatch/config.ron)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Orchestrator base URL, overrides the config file")]
    pub server: Option<String>,

    #[arg(short, long, help = "Also write diagnostics to stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the running job, if any, until it finishes.
    Watch,
    /// Start a job and follow it.
    Start {
        #[arg(long)]
        region: String,
        #[arg(long)]
        category: String,
        /// Run a single step instead of the full pipeline.
        #[arg(long)]
        step: Option<String>,
    },
    /// Interrupt the running job.
    Stop,
    /// Show or change the colour theme.
    Theme { choice: Option<ThemeChoice> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

pub fn start_form(region: String, category: String, step: Option<String>) -> StartForm {
    let run_type = if step.is_some() {
        RunType::Step
    } else {
        RunType::Full
    };
    StartForm {
        region,
        category,
        run_type,
        step,
    }
}
