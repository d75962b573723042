use std::{fs::OpenOptions, path::PathBuf, process::ExitCode, sync::Mutex};

use anyhow::{Context, Result};
use asset_sync::{
    config::{AppConfig, api_key_from_env},
    notify::LogSink,
    pipeline::{Pipeline, RunReport},
    retry::TokioSleeper,
    watchlist::{HttpWatchlist, StaticWatchlist, WatchlistProvider, normalize_symbols},
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use market_data_ingestor::providers::{coingecko::CoinGeckoClient, yahoo::YahooClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Keeps crypto datasets, BTC dominance and option snapshots up to date")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(long, short, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Full run: crypto sync, dominance, option snapshots, notifications.
    Run,
    /// Sync the given crypto datasets (all configured ones when empty).
    Sync { symbols: Vec<String> },
    /// Append one dominance sample.
    Dominance,
    /// Write today's option snapshot for the given symbols (the watchlist when empty).
    Options { symbols: Vec<String> },
}

fn init_tracing(cfg: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let cfg = AppConfig::load(cli.config.as_deref())?;
    init_tracing(&cfg)?;
    let _api_key = api_key_from_env();

    let timeout = cfg.request_timeout();
    let yahoo = YahooClient::new(timeout)?;
    let coingecko = CoinGeckoClient::new(timeout)?;
    let fallback = StaticWatchlist::new(&cfg.watchlist.fallback);
    let watchlist = HttpWatchlist::new(cfg.watchlist.url.clone(), timeout, fallback)?;
    let sink = LogSink::new(cfg.notify.link_base.clone());
    let sleeper = TokioSleeper;

    let pipeline = Pipeline::new(&cfg, &yahoo, &coingecko, &watchlist, &sink, &sleeper);
    let now = Utc::now();

    let report = match cli.cmd {
        Cmd::Run => pipeline.run(now).await?,
        Cmd::Sync { symbols } => {
            pipeline.prepare_dirs(now)?;
            let symbols = if symbols.is_empty() {
                cfg.crypto.symbols.clone()
            } else {
                normalize_symbols(&symbols)
            };
            let mut report = RunReport::default();
            pipeline.sync_crypto(&symbols, now, &mut report).await;
            report
        }
        Cmd::Dominance => {
            pipeline.prepare_dirs(now)?;
            let mut report = RunReport::default();
            pipeline.record_dominance(now, &mut report).await;
            report
        }
        Cmd::Options { symbols } => {
            pipeline.prepare_dirs(now)?;
            let symbols = if symbols.is_empty() {
                watchlist.get_watchlist().await
            } else {
                normalize_symbols(&symbols)
            };
            let mut report = RunReport::default();
            pipeline.snapshot_options(&symbols, now, &mut report).await;
            report
        }
    };

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        for f in &report.failures {
            tracing::error!(step = %f.step, target = %f.target, error = %f.error, "failed");
        }
        Ok(ExitCode::FAILURE)
    }
}
