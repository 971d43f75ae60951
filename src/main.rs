// Copyright 2026 Vaultwatch Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use vaultwatch::collector::{Collector, CollectorConfig, ScrapeMode};
use vaultwatch::reading::{apply_display_order, NetApy, Sentinel, VaultReading};
use vaultwatch::registry::{builtin_vaults, DISPLAY_ORDER};
use vaultwatch::renderer::chromium::ChromiumRenderer;
use vaultwatch::renderer::Renderer;
use vaultwatch::temporal::store::{FsBackend, SnapshotStore};
use vaultwatch::temporal::trends;

#[derive(Parser)]
#[command(
    name = "vaultwatch",
    about = "Vaultwatch — DeFi vault Net APY tracker",
    version,
    after_help = "Run 'vaultwatch <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Snapshot directory (default: ~/.vaultwatch/data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect a fresh reading for every vault and snapshot the run
    Collect {
        /// Scrape with plain HTTP only (no headless browser)
        #[arg(long, alias = "no-browser")]
        raw_only: bool,
        /// Skip scraping entirely; API-backed vaults only
        #[arg(long)]
        api_only: bool,
        /// Print readings without writing a snapshot
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the most recent snapshot
    Latest,
    /// List snapshots in the trailing window
    History {
        /// Window size in days
        #[arg(long, default_value = "7")]
        days: i64,
        /// Show the snapshot for one calendar date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Rate trend for one vault over the trailing window
    Trends {
        /// Vault name as shown in snapshots
        vault: String,
        #[arg(long, default_value = "7")]
        days: i64,
    },
    /// Summary statistics across the store
    Stats {
        #[arg(long, default_value = "30")]
        days: i64,
    },
    /// Remove snapshots older than the retention window
    Cleanup {
        /// Retention in days
        #[arg(long, default_value = "30")]
        retention: i64,
    },
    /// Copy all snapshots into a dated backup directory
    Backup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("vaultwatch={level}").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => dirs::home_dir()
            .context("cannot determine home directory")?
            .join(".vaultwatch")
            .join("data"),
    };
    let store = SnapshotStore::new(FsBackend::new(data_dir)?);

    match cli.command {
        Commands::Collect {
            raw_only,
            api_only,
            dry_run,
        } => run_collect(&store, raw_only, api_only, dry_run).await,
        Commands::Latest => run_latest(&store),
        Commands::History { days, date } => run_history(&store, days, date),
        Commands::Trends { vault, days } => run_trends(&store, &vault, days),
        Commands::Stats { days } => run_stats(&store, days),
        Commands::Cleanup { retention } => {
            let removed = store.cleanup(retention)?;
            println!("removed {removed} snapshot(s) older than {retention} days");
            Ok(())
        }
        Commands::Backup => {
            let prefix = store.backup()?;
            println!("backup written under {prefix}");
            Ok(())
        }
    }
}

async fn run_collect(
    store: &SnapshotStore<FsBackend>,
    raw_only: bool,
    api_only: bool,
    dry_run: bool,
) -> Result<()> {
    let mode = if api_only {
        ScrapeMode::Disabled
    } else if raw_only {
        ScrapeMode::RawOnly
    } else {
        ScrapeMode::Rendered
    };

    let config = CollectorConfig {
        mode,
        ..CollectorConfig::default()
    };
    let mut collector = Collector::new(config);

    if mode == ScrapeMode::Rendered {
        match ChromiumRenderer::new().await {
            Ok(renderer) => {
                info!("Chromium renderer initialized");
                let renderer: Arc<dyn Renderer> = Arc::new(renderer);
                collector = collector.with_renderer(renderer);
            }
            Err(e) => {
                warn!(error = %e, "no browser available, falling back to raw fetching");
            }
        }
    }

    let vaults = builtin_vaults();
    let readings = collector.collect(&vaults).await;
    print_readings(&readings);

    if dry_run {
        return Ok(());
    }
    let snapshot = store.write(readings)?;
    println!();
    println!("snapshot saved: {} {}", snapshot.date, snapshot.time);
    Ok(())
}

fn run_latest(store: &SnapshotStore<FsBackend>) -> Result<()> {
    match store.latest()? {
        Some(snapshot) => {
            println!("collected at {}", snapshot.timestamp.to_rfc3339());
            print_readings(&snapshot.vaults);
        }
        None => println!("no snapshots recorded yet"),
    }
    Ok(())
}

fn run_history(
    store: &SnapshotStore<FsBackend>,
    days: i64,
    date: Option<NaiveDate>,
) -> Result<()> {
    if let Some(date) = date {
        match store.by_date(date)? {
            Some(snapshot) => {
                println!("snapshot for {} at {}", snapshot.date, snapshot.time);
                print_readings(&snapshot.vaults);
            }
            None => println!("no snapshot recorded on {date}"),
        }
        return Ok(());
    }

    let snapshots = store.history(days)?;
    if snapshots.is_empty() {
        println!("no snapshots in the last {days} day(s)");
        return Ok(());
    }
    println!("{} snapshot(s) in the last {days} day(s):", snapshots.len());
    for s in &snapshots {
        let ok = s.vaults.iter().filter(|r| r.net_apy.rate().is_some()).count();
        println!("  {} {}  {}/{} vaults", s.date, s.time, ok, s.vaults.len());
    }
    Ok(())
}

fn run_trends(store: &SnapshotStore<FsBackend>, vault: &str, days: i64) -> Result<()> {
    let trend = trends::trends_for(store, vault, days)?;
    if trend.samples.is_empty() {
        println!("no readings for '{vault}' in the last {days} day(s)");
        return Ok(());
    }

    println!("{} over {} day(s):", trend.vault, days);
    for (at, rate) in &trend.samples {
        println!("  {}  {}", at.format("%Y-%m-%d %H:%M"), fmt_rate(*rate));
    }
    if let (Some(hi), Some(lo)) = (trend.highest, trend.lowest) {
        println!("  high {}  low {}", fmt_rate(hi), fmt_rate(lo));
    }
    match trend.change_pct {
        Some(change) => println!("  change {change:+.2}%"),
        None => println!("  change n/a (need at least two readings)"),
    }
    Ok(())
}

fn run_stats(store: &SnapshotStore<FsBackend>, days: i64) -> Result<()> {
    let stats = trends::aggregate_stats(store, days)?;
    println!("vaults tracked:  {}", stats.vault_count);
    println!("snapshots ({days}d): {}", stats.record_count);
    if let Some(avg) = stats.average {
        println!("average net APY: {}", fmt_rate(avg));
    }
    if let (Some(hi), Some(lo)) = (stats.highest, stats.lowest) {
        println!("highest:         {}", fmt_rate(hi));
        println!("lowest:          {}", fmt_rate(lo));
    }
    if let Some((oldest, newest)) = stats.range {
        println!(
            "range:           {} .. {}",
            oldest.format("%Y-%m-%d %H:%M"),
            newest.format("%Y-%m-%d %H:%M")
        );
    }

    let extrema = trends::extrema_over_window(store, days)?;
    if !extrema.is_empty() {
        println!();
        println!("per-vault extrema ({days}d):");
        for (name, e) in &extrema {
            println!(
                "  {name:<28} max {}  min {}  ({} sample(s))",
                fmt_rate(e.max),
                fmt_rate(e.min),
                e.samples.len()
            );
        }
    }
    Ok(())
}

fn fmt_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Fixed-order vault table followed by a roster of failed vaults.
fn print_readings(readings: &[VaultReading]) {
    for reading in apply_display_order(readings, DISPLAY_ORDER) {
        let shown = match &reading.net_apy {
            NetApy::Rate(rate) => fmt_rate(*rate),
            NetApy::Sentinel(Sentinel::Error) => "error".to_string(),
            NetApy::Sentinel(Sentinel::Unavailable) => "unavailable".to_string(),
        };
        println!("  {:<28} {:<8} {shown}", reading.name, reading.asset);
    }

    let failed: Vec<&str> = readings
        .iter()
        .filter(|r| r.net_apy.is_error())
        .map(|r| r.name.as_str())
        .collect();
    if !failed.is_empty() {
        println!();
        println!("failed: {}", failed.join(", "));
    }
}
