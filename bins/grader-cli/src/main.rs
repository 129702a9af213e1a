mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "grader-cli")]
#[command(about = "Grader CLI - Grade submissions locally and check the toolchain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade a source file against a set of test cases
    Grade {
        /// Path to the submission source
        #[arg(short, long)]
        source: PathBuf,

        /// JSON file holding an array of {input, expected_output}
        #[arg(short, long)]
        cases: PathBuf,

        /// Per-test-case timeout override in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Engine config file (defaults to config/grader.json when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Verify the compiler and runtime can be launched
    Check {
        /// Engine config file (defaults to config/grader.json when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Grade {
            source,
            cases,
            timeout_ms,
            config,
        } => commands::grade(&source, &cases, timeout_ms, config.as_deref()).await?,
        Commands::Check { config } => commands::check(config.as_deref()).await?,
    };

    Ok(ExitCode::from(code))
}
