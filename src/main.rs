//! ccsample: sample keyword-filtered plain text from Common Crawl

mod commands;

use anyhow::{Context, Result};
use ccsample::config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::{LocateArgs, ProcessArgs, RunArgs};

#[derive(Parser)]
#[command(name = "ccsample")]
#[command(about = "Sample keyword-filtered plain text from Common Crawl segments")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults are used if it does not exist)
    #[arg(short, long, default_value = "ccsample.toml", global = true)]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (no progress bars or summary)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate, download and extract a sample of the latest crawl
    Run(RunArgs),

    /// Extract documents from segment files already on disk
    Process(ProcessArgs),

    /// Print the resolved crawl id and sampled segment paths
    Locate(LocateArgs),

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if cli.quiet {
        config.pipeline.quiet = true;
    }

    init_logging(&config, cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Run(args) => commands::run::run_sample(config, args).await,
        Commands::Process(args) => commands::process::process_files(config, args).await,
        Commands::Locate(args) => commands::locate::locate_segments(config, args).await,
        Commands::Init { path, force } => commands::init::init_config(path, force),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over config and flags.
fn init_logging(config: &Config, verbose: u8, quiet: bool) -> Result<()> {
    let logging = &config.logging;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.directive(verbose, quiet)));

    match logging.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(logging.ansi)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
