//! Market Data Binary
//!
//! Loads configuration, replays a tick record file through the per-symbol
//! ingestion pipeline and reports the resulting charts.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin market-data
//! ```
//!
//! # Environment Variables
//!
//! - `MARKET_DATA_CONFIG`: Config file path (default: config.yaml)
//! - `RUST_LOG`: Log filter (overrides `observability.logging.level`)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use market_data::config::{Config, SplitsConfig, load_config};
use market_data::ingest::{IngestService, read_replay_file};
use market_data::observability::{MetricsConfig, init_metrics};
use market_data::telemetry::init_tracing;
use market_data::{MarketDataError, OhlcvBar, SplitLedger, SymbolDictionary};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv_path = load_dotenv();

    let config = load_config(None).context("failed to load configuration")?;
    init_tracing(&config.observability.logging).context("failed to initialize tracing")?;
    match dotenv_path {
        Some(path) => info!(path = %path.display(), ".env loaded"),
        None => info!("no .env file found"),
    }

    let metrics_port = config.observability.metrics_port;
    if metrics_port != 0 {
        init_metrics(&MetricsConfig::with_port(metrics_port))
            .context("failed to start metrics exporter")?;
        info!(port = metrics_port, "Prometheus exporter listening");
    }

    let ledger = open_ledger(&config.splits)?;
    run(&config, &ledger).await?;

    if ledger.default_save_to().is_some() {
        ledger.validate()?;
        ledger.save().context("failed to save splits database")?;
        info!(splits = ledger.size(), "splits database saved");
    }

    info!("market data shutdown complete");
    Ok(())
}

async fn run(config: &Config, ledger: &SplitLedger) -> anyhow::Result<()> {
    let dictionary = Arc::new(config.dictionary.build()?);
    let clock = config.session.clock()?;
    let window = config.session.window();
    info!(
        trading_day = %clock.trading_day(),
        session_start = %clock.to_utc(window.start),
        session_end = %clock.to_utc(window.end),
        granularity_ms = window.granularity_ms,
        symbols = dictionary.len(),
        "session configured"
    );

    let Some(replay_path) = config.ingest.replay_path.as_deref() else {
        info!("no replay file configured, nothing to ingest");
        return Ok(());
    };

    let records = read_replay_file(replay_path)
        .await
        .with_context(|| format!("failed to read replay file {}", replay_path.display()))?;

    let mut service = IngestService::new(
        Arc::clone(&dictionary),
        window,
        config.ingest.channel_capacity,
    );
    let mut rejected = 0_usize;
    for record in &records {
        match service.submit(record).await {
            Ok(()) => {}
            Err(
                e @ (MarketDataError::MissingSymbol { .. } | MarketDataError::InvalidArgument(_)),
            ) => {
                rejected += 1;
                warn!(error = %e, "record rejected");
            }
            Err(e) => return Err(e.into()),
        }
    }
    info!(records = records.len(), rejected, "replay complete");

    let charts = service.shutdown().await?;
    for (symbol, chart) in &charts {
        chart.validate()?;
        let volume: i64 = chart.iter().map(|(_, bar)| bar.volume()).sum();
        let splits = ledger.events(symbol).map_or(0, |events| events.len());
        info!(
            symbol = %symbol,
            code = ?dictionary.code_of(symbol),
            bars = chart.non_null_count(),
            last_slot = ?chart.highest_set_index(),
            volume,
            splits,
            "chart summary"
        );
    }
    Ok(())
}

fn open_ledger(config: &SplitsConfig) -> anyhow::Result<SplitLedger> {
    let Some(path) = config.db_path.as_deref() else {
        return Ok(SplitLedger::new());
    };

    if path.exists() {
        let ledger = SplitLedger::load(path)
            .with_context(|| format!("failed to load splits database {}", path.display()))?;
        info!(path = %path.display(), symbols = ledger.size(), "splits database loaded");
        Ok(ledger)
    } else {
        warn!(path = %path.display(), "splits database not found, starting empty");
        let mut ledger = SplitLedger::new();
        ledger.set_save_to(path);
        Ok(ledger)
    }
}

/// Load .env from the current directory, falling back to ancestor directories.
fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok().or_else(load_dotenv_from_ancestors)
}

/// Load the nearest .env found walking up from the current directory.
fn load_dotenv_from_ancestors() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let env_path = find_in_ancestors(&cwd, ".env")?;
    dotenvy::from_path(&env_path).ok().map(|()| env_path)
}

/// First `name` in a parent of `start`, nearest first.
fn find_in_ancestors(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .skip(1)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.exists())
}
