//! Command-line argument parsing.

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::commands;

/// feature-pilot: coding-agent orchestration core
#[derive(Parser)]
#[command(name = "fpilot", author, version, about)]
pub struct Cli {
    /// Project root holding `.feature-pilot/` (defaults to the current directory).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt to the agent serving MODEL and print canonical events as JSON lines.
    Query {
        /// Model id, e.g. "claude-sonnet-4-5", "gpt-5-codex" or "mock".
        #[arg(long, short)]
        model: String,

        /// System prompt.
        #[arg(long)]
        system: Option<String>,

        /// Working directory of the agent process.
        #[arg(long)]
        cwd: Option<PathBuf>,

        prompt: String,
    },

    /// Run a shell command as a supervised session. Ctrl-C stops it.
    Run {
        /// Directory the command runs in (defaults to the current directory).
        #[arg(long)]
        scope: Option<PathBuf>,

        /// File path appended to the command, after sanitizing.
        #[arg(long)]
        target: Option<String>,

        command: String,
    },

    /// Print the status a feature moves to next.
    NextStatus {
        /// Current status, e.g. "in_progress" or "pipeline_step_review".
        #[arg(long)]
        status: String,

        /// Step id skipped for this feature. Repeatable.
        #[arg(long = "exclude")]
        excluded: Vec<String>,

        /// End at waiting_approval instead of verified.
        #[arg(long)]
        skip_tests: bool,
    },

    /// List the providers whose backend is usable on this machine.
    Providers,
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let config = fp_core::config::load_config(&root).await?;

        match self.command {
            Commands::Query {
                model,
                system,
                cwd,
                prompt,
            } => {
                commands::query(&config, &model, system, cwd.unwrap_or(root), &prompt).await
            }
            Commands::Run {
                scope,
                target,
                command,
            } => commands::run(&config, &scope.unwrap_or(root), &command, target.as_deref()).await,
            Commands::NextStatus {
                status,
                excluded,
                skip_tests,
            } => commands::next_status(&config, &status, &excluded, skip_tests),
            Commands::Providers => commands::providers(&config).await,
        }
    }
}
