//! Comicer main entry point
//!
//! This is the command-line interface for the Comicer download engine.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comicer::config::{default_config_path, load_config_with_hash, render_config, Config};
use comicer::crawler::run_sources;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Comicer: keeps a local copy of your favorited comics
///
/// Comicer logs into each configured source, walks the favorites list and
/// downloads every file that earlier runs have not fetched yet.
#[derive(Parser, Debug)]
#[command(name = "comicer")]
#[command(version)]
#[command(about = "Downloads new files from your favorited comics", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Work with configured sources
    Source {
        #[command(subcommand)]
        action: SourceAction,
    },

    /// Print the effective configuration, passwords redacted
    Config,
}

#[derive(Subcommand, Debug)]
enum SourceAction {
    /// Run one or more sources
    Start {
        /// Run every configured source
        #[arg(short, long, conflicts_with = "sources")]
        all: bool,

        /// Names of the sources to run
        #[arg(value_name = "SOURCES", required_unless_present = "all")]
        sources: Vec<String>,
    },

    /// List configured sources
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, hash) = load_config_with_hash(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    match cli.command {
        Command::Source { action } => match action {
            SourceAction::Start { all, sources } => handle_start(&config, all, sources).await,
            SourceAction::List => {
                handle_list(&config);
                Ok(())
            }
        },
        Command::Config => handle_config(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("comicer=info,warn"),
            1 => EnvFilter::new("comicer=debug,info"),
            2 => EnvFilter::new("comicer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `source start`: runs the sources side by side
async fn handle_start(config: &Config, all: bool, sources: Vec<String>) -> anyhow::Result<()> {
    let names = if all {
        config.sources.iter().map(|s| s.name.clone()).collect()
    } else {
        sources
    };

    if names.is_empty() {
        tracing::warn!("No sources configured, nothing to do");
        return Ok(());
    }

    tracing::info!("Starting {} source(s): {}", names.len(), names.join(", "));
    let outcomes = run_sources(config, &names).await?;

    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.is_success())
        .map(|o| o.name.as_str())
        .collect();

    if !failed.is_empty() {
        bail!("{} of {} source(s) failed: {}", failed.len(), outcomes.len(), failed.join(", "));
    }

    tracing::info!("All sources completed successfully");
    Ok(())
}

/// Handles `source list`
fn handle_list(config: &Config) {
    for source in &config.sources {
        println!("{}({})", source.name, source.origin_label());
    }
}

/// Handles `config`
fn handle_config(config: &Config) -> anyhow::Result<()> {
    print!("{}", render_config(config)?);
    Ok(())
}
