use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repodex::opener::SystemOpener;
use repodex::tui;
use repodex::{Config, GitHubClient, SnapshotStore, SyncEngine};

#[derive(Parser)]
#[command(name = "repodex")]
#[command(about = "Find and open your GitHub repositories and pull requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot cache file path (defaults to config or XDG location)
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch repositories and pull requests for all configured identities
    Sync,

    /// Browse the cached snapshot interactively
    Find,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only initialize logging for sync - the finder owns the terminal and
    // stdout logging breaks raw mode
    let is_tui = matches!(cli.command, Commands::Find);
    if !is_tui {
        init_logging(cli.verbose)?;
        info!("Starting repodex v{}", env!("CARGO_PKG_VERSION"));
    }

    let config = load_config(cli.config)?;

    let cache_path = match cli.cache_file {
        Some(path) => path,
        None => config.cache_path()?,
    };
    let store = SnapshotStore::new(cache_path);

    match cli.command {
        Commands::Sync => cmd_sync(&config, store).await,
        Commands::Find => cmd_find(store),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(&path),
        None => Config::load_or_default(),
    }
}

/// Re-fetch everything and replace the snapshot cache
async fn cmd_sync(config: &Config, mut store: SnapshotStore) -> Result<()> {
    if config.identities.is_empty() {
        bail!(
            "no identities configured; add at least one to {:?}",
            Config::default_config_path()?
        );
    }

    let client = GitHubClient::new().context("failed to build GitHub client")?;
    let engine = SyncEngine::new(Arc::new(client));

    let snapshot = engine.sync(&config.identities, &mut store).await?;

    println!(
        "Synced {} repositories and {} open pull requests",
        snapshot.repositories.len(),
        snapshot.pull_requests.len()
    );
    println!("Snapshot written to {}", store.path().display());

    Ok(())
}

/// Browse the cached snapshot in the interactive finder
fn cmd_find(mut store: SnapshotStore) -> Result<()> {
    let snapshot = store.load()?.clone();

    tui::run_finder(&snapshot, Box::new(SystemOpener))
}
