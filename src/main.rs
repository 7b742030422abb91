//! db-pulse: fleet health-check engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   config (TOML) ──▶ registry ──▶ scheduler ──▶ probe (TCP) ──▶ classifier
//!        │                            │                              │
//!        │ watcher (hot reload)       │ auto-run timer               ▼
//!        └──────────────────────────▶ │                         health store
//!                                     │                              │
//!                                     └── persistence sink ◀─────────┤
//!                                                                    ▼
//!                                              filter / sort ──▶ CLI output
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use db_pulse::config::{load_config, ConfigError, ConfigWatcher, PulseConfig};
use db_pulse::filter::{self, FilterSet};
use db_pulse::health::{HealthRow, HealthStore};
use db_pulse::lifecycle::{apply_reload, build_scheduler, signals, Shutdown};
use db_pulse::observability::{logging, metrics};
use db_pulse::persistence::JsonFileSink;
use db_pulse::probe::TcpProbe;

#[derive(Parser)]
#[command(name = "db-pulse")]
#[command(about = "Periodic health checks for a fleet of database targets", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "db-pulse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll targets until interrupted
    Run,
    /// Run a single batch and print the results
    Once {
        /// Only check this target
        #[arg(short, long)]
        target: Option<String>,
        /// Row filter, `field op value` (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        #[command(flatten)]
        order: SortArgs,
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration file
    CheckConfig,
    /// Print the persisted snapshot
    Show {
        /// Snapshot file; defaults to persistence.snapshot_path
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
        /// Row filter, `field op value` (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        #[command(flatten)]
        order: SortArgs,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SortArgs {
    /// Sort rows by a field, e.g. `severity` or `ts_pct`
    #[arg(long)]
    sort: Option<String>,
    /// Sort in descending order
    #[arg(long, requires = "sort")]
    desc: bool,
}

impl SortArgs {
    fn apply(&self, rows: &mut Vec<HealthRow>) {
        if let Some(field) = &self.sort {
            filter::sort(rows, field, self.desc);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Commands::CheckConfig = cli.command {
        return check_config(&cli.config);
    }

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability)?;
    tracing::info!(config = ?cli.config, "db-pulse v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run => run(&cli.config, config).await,
        Commands::Once {
            target,
            filters,
            order,
            json,
        } => once(config, target, &filters, &order, json).await,
        Commands::Show {
            snapshot,
            filters,
            order,
            json,
        } => show(&config, snapshot, &filters, &order, json),
        Commands::CheckConfig => Ok(()),
    }
}

fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match load_config(path) {
        Ok(config) => {
            println!(
                "{}: OK ({} targets, {} threshold overrides)",
                path.display(),
                config.targets.len(),
                config.thresholds.rules.len()
            );
            Ok(())
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("{}: {} problem(s)", path.display(), errors.len());
            for e in &errors {
                eprintln!("  - {}", e);
            }
            Err(ConfigError::Validation(errors).into())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(path: &Path, config: PulseConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let scheduler = build_scheduler(&config, Arc::new(TcpProbe::new()))?;
    let shutdown = Shutdown::new();

    let (watcher, mut updates) = ConfigWatcher::new(path);
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let reload_scheduler = Arc::clone(&scheduler);
    let mut reload_shutdown = shutdown.subscribe();
    let reload_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(config) = updates.recv() => {
                    if let Err(e) = apply_reload(&reload_scheduler, &config) {
                        tracing::error!(error = %e, "Failed to apply reloaded config");
                    }
                }
                _ = reload_shutdown.recv() => break,
            }
        }
    });

    if config.scheduler.auto_run {
        scheduler.start_auto_run(config.scheduler.interval())?;
    } else {
        tracing::info!("Auto-run disabled, waiting for shutdown");
    }

    signals::wait_for_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();

    if let Some(handle) = scheduler.stop_auto_run() {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Auto-run loop ended abnormally");
        }
    }
    let _ = reload_task.await;

    if let Err(e) = scheduler.persist() {
        tracing::error!(error = %e, "Failed to persist final snapshot");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn once(
    config: PulseConfig,
    target: Option<String>,
    filters: &[String],
    order: &SortArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let predicates = combined_filters(&config, filters)?;
    let scheduler = build_scheduler(&config, Arc::new(TcpProbe::new()))?;

    let report = match target {
        Some(id) => scheduler.run_target(&id).await?,
        None => scheduler.run_once(&scheduler.registry().enabled()).await,
    };
    scheduler.persist()?;

    let mut rows = filter::evaluate(&scheduler.store().rows(), &predicates);
    order.apply(&mut rows);
    print_rows(&rows, json)?;
    if !json {
        println!(
            "\nbatch {}: {} checked, {} skipped, worst {} in {}ms",
            report.run_id,
            report.completed(),
            report.skipped.len(),
            report.worst().map(|s| s.as_str()).unwrap_or("-"),
            report.elapsed.as_millis()
        );
    }
    Ok(())
}

fn show(
    config: &PulseConfig,
    snapshot: Option<PathBuf>,
    filters: &[String],
    order: &SortArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let predicates = combined_filters(config, filters)?;
    let path = snapshot
        .or_else(|| config.persistence.snapshot_path.clone())
        .ok_or("no snapshot path: pass --snapshot or set persistence.snapshot_path")?;

    let store = HealthStore::new();
    store.load_snapshot(JsonFileSink::new(path).load()?);

    let mut rows = filter::evaluate(&store.rows(), &predicates);
    order.apply(&mut rows);
    print_rows(&rows, json)?;
    Ok(())
}

fn combined_filters(config: &PulseConfig, extra: &[String]) -> Result<FilterSet, filter::FilterError> {
    let mut set = config.filter_set()?;
    set.extend(filter::parse_all(extra)?);
    Ok(set)
}

fn print_rows(rows: &[HealthRow], json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    println!(
        "{:<20} {:<10} {:<12} {:<12} {:>8}  {:<20} NOTES",
        "TARGET", "ENV", "STATE", "SEVERITY", "MS", "CHECKED"
    );
    for row in rows {
        let (severity, elapsed, checked, notes) = match &row.result {
            Some(r) => (
                r.severity.to_string(),
                r.elapsed_ms().to_string(),
                r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.notes.join("; "),
            ),
            None => ("-".into(), "-".into(), "never".into(), String::new()),
        };
        println!(
            "{:<20} {:<10} {:<12} {:<12} {:>8}  {:<20} {}",
            row.target_id,
            row.environment,
            row.check_state.as_str(),
            severity,
            elapsed,
            checked,
            notes
        );
    }
    Ok(())
}
