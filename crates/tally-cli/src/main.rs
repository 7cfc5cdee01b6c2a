//! Command-line interface for Tally
//!
//! Runs a batch of operations concurrently against a fresh ledger, audits the
//! history for conflicts, and prints every recorded entry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tally_dispatch::{Dispatcher, WorkItem};
use tally_ledger::{Ledger, LedgerConfig, NoopRecovery};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Tally - concurrent operation ledger with conflict auditing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (lock acquire/release)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a batch concurrently, audit it, and print the history
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Operation as worker:resource:action (repeatable)
    #[arg(long = "op", value_parser = WorkItem::parse)]
    ops: Vec<WorkItem>,

    /// Config file path (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the simulated recovery delay
    #[arg(long)]
    no_delay: bool,

    /// Print the history as JSON
    #[arg(long)]
    json: bool,
}

fn default_batch() -> Vec<WorkItem> {
    vec![
        WorkItem::new("Thread 1", "ResourceA", "Update"),
        WorkItem::new("Thread 2", "ResourceA", "Delete"),
        WorkItem::new("Thread 3", "ResourceB", "Create"),
        WorkItem::new("Thread 4", "ResourceA", "Update"),
    ]
}

fn load_config(path: Option<&PathBuf>) -> Result<LedgerConfig> {
    let mut config = match path {
        Some(path) => LedgerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    config.merge_with_env()?;
    Ok(config)
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_ref())?;

    let mut ledger = Ledger::try_with_config(&config)?;
    if args.no_delay {
        ledger = ledger.with_recovery(Arc::new(NoopRecovery));
    }
    let dispatcher = Dispatcher::new(Arc::new(ledger));

    let items = if args.ops.is_empty() {
        default_batch()
    } else {
        args.ops
    };

    let report = dispatcher.submit_batch(items).await;
    tracing::info!(
        recorded = report.recorded(),
        failed = report.failed(),
        "batch finished"
    );

    let audit = dispatcher.run_conflict_audit().await;
    tracing::info!(conflicts = audit.len(), "audit finished");

    let history = dispatcher.ledger().snapshot();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
    } else {
        println!("\nAll operations in the ledger:");
        for entry in &history {
            println!("{entry}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await?,
    }

    Ok(())
}
