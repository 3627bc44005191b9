//! Upward CLI - apply SQL migrations from the terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::{check, new, status, up};

/// Upward - apply versioned SQL migrations exactly once
#[derive(Parser)]
#[command(name = "upward", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every subcommand
#[derive(Args)]
pub struct GlobalArgs {
    /// Settings file
    #[arg(long, global = true, default_value = upward_core::config::SETTINGS_FILE)]
    pub config: PathBuf,

    /// Database file, or :memory:
    #[arg(long, global = true, env = "UPWARD_DATABASE")]
    pub database: Option<PathBuf>,

    /// Directory holding the migration scripts
    #[arg(long, global = true, env = "UPWARD_MIGRATIONS_DIR")]
    pub dir: Option<PathBuf>,

    /// Show engine diagnostics
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Up {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ledger frontier and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an empty up/down migration pair
    New {
        /// Migration name, e.g. create_users
        name: String,
    },

    /// Syntax-check migration scripts without running them
    Check {
        /// Check every script, not only pending ones
        #[arg(long)]
        all: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,upward_core=debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Up { json } => up::run(&cli.global, json),
        Commands::Status { json } => status::run(&cli.global, json),
        Commands::New { name } => new::run(&cli.global, &name),
        Commands::Check { all } => check::run(&cli.global, all),
    }
}
