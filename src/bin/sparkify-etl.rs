//! sparkify-etl: load song and log files into PostgreSQL
//!
//! # Usage
//!
//! ```bash
//! # Load data/song_data then data/log_data into the local sparkifydb
//! sparkify-etl
//!
//! # Parse and transform everything without touching the database
//! sparkify-etl --dry-run
//!
//! # Another database and input tree
//! sparkify-etl --database-url postgres://etl@db/sparkify --song-data /srv/songs --log-data /srv/logs
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sparkify_etl::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sparkify-etl")]
#[command(version)]
#[command(about = "Load song metadata and activity logs into the sparkify star schema", long_about = None)]
#[command(after_help = "EXAMPLES:
    sparkify-etl
    sparkify-etl --dry-run
    sparkify-etl --config etl.toml --log-data data/log_data/2018/11")]
struct Cli {
    /// Config file (default: ./sparkify.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "SPARKIFY_DATABASE_URL")]
    database_url: Option<String>,

    /// Root of the song metadata files
    #[arg(long)]
    song_data: Option<PathBuf>,

    /// Root of the activity log files
    #[arg(long)]
    log_data: Option<PathBuf>,

    /// Transform into memory only; nothing is written
    #[arg(short, long)]
    dry_run: bool,

    /// Verbose logging (same as RUST_LOG=info)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn execute(cli: &Cli) -> Result<()> {
    let mut config = EtlConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(url) = &cli.database_url {
        config.database_url = url.clone();
    }
    if let Some(path) = &cli.song_data {
        config.song_data = path.clone();
    }
    if let Some(path) = &cli.log_data {
        config.log_data = path.clone();
    }

    if cli.dry_run {
        let mut store = MemoryStore::new();
        let report = sparkify_etl::run(&config, &mut store).await?;
        print_dry_run(&store, &report);
        return Ok(());
    }

    info!("connecting to database");
    let mut store = PgStore::connect(&config.database_url, config.statements.clone()).await?;

    sparkify_etl::run_and_close(&config, &mut store).await?;

    Ok(())
}

fn print_dry_run(store: &MemoryStore, report: &LoadReport) {
    let tables = store.committed();
    println!();
    println!("{}", "Dry run, nothing written:".yellow().bold());
    println!("  {:10} {}", "songs", tables.songs.len().to_string().cyan());
    println!("  {:10} {}", "artists", tables.artists.len().to_string().cyan());
    println!("  {:10} {}", "time", tables.time.len().to_string().cyan());
    println!("  {:10} {}", "users", tables.users.len().to_string().cyan());
    println!(
        "  {:10} {} ({} matched, {} unmatched)",
        "songplays",
        tables.songplays.len().to_string().cyan(),
        report.matched,
        report.unmatched()
    );
}
