//! The end-to-end run: crypto sync, dominance, option snapshots, notifications.
//!
//! Steps run in that fixed order, one symbol at a time. A failing symbol is
//! logged and recorded in the [`RunReport`]; the remaining symbols and steps
//! still run. Only an unusable output directory aborts the run.

use std::{fmt, fs, path::PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use market_data_ingestor::providers::{MarketDataClient, MarketSnapshotClient};

use crate::{
    config::AppConfig,
    dominance::record_dominance,
    notify::{NotificationSink, NotifyReport, notify_subscribers},
    options::OptionChainFetcher,
    retry::Sleeper,
    store::{
        dataset::DatasetStore,
        dominance::{DominanceSample, DominanceSeries},
        snapshot::SnapshotWriter,
    },
    sync::{SyncEngine, SyncOutcome},
    tz::as_of_date,
    watchlist::WatchlistProvider,
};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Crypto dataset sync.
    Sync,
    /// Dominance sample.
    Dominance,
    /// Option snapshot.
    Options,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Sync => "sync",
            Step::Dominance => "dominance",
            Step::Options => "options",
        })
    }
}

/// One isolated failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Stage that failed.
    pub step: Step,
    /// Symbol (or series) it failed for.
    pub target: String,
    /// Rendered error.
    pub error: String,
}

/// Everything a run did.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per crypto ticker outcome.
    pub synced: Vec<(String, SyncOutcome)>,
    /// Dominance sample, when recorded.
    pub dominance: Option<DominanceSample>,
    /// Snapshot files written.
    pub snapshots: Vec<PathBuf>,
    /// Notification deliveries.
    pub notifications: NotifyReport,
    /// Isolated failures.
    pub failures: Vec<StepFailure>,
}

impl RunReport {
    /// No step failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.notifications.failed.is_empty()
    }

    fn fail(&mut self, step: Step, target: &str, error: impl fmt::Display) {
        tracing::error!(%step, target, %error, "step failed");
        self.failures.push(StepFailure {
            step,
            target: target.to_string(),
            error: error.to_string(),
        });
    }
}

/// Wiring of collaborators for one run.
pub struct Pipeline<'a> {
    config: &'a AppConfig,
    market: &'a dyn MarketDataClient,
    snapshot: &'a dyn MarketSnapshotClient,
    watchlist: &'a dyn WatchlistProvider,
    sink: &'a dyn NotificationSink,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Pipeline<'a> {
    /// Assembles a pipeline.
    pub fn new(
        config: &'a AppConfig,
        market: &'a dyn MarketDataClient,
        snapshot: &'a dyn MarketSnapshotClient,
        watchlist: &'a dyn WatchlistProvider,
        sink: &'a dyn NotificationSink,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            config,
            market,
            snapshot,
            watchlist,
            sink,
            sleeper,
        }
    }

    /// Creates `<root>/crypto` and `<root>/options/<today>`.
    pub fn prepare_dirs(&self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let crypto = self.config.crypto_root();
        fs::create_dir_all(&crypto).with_context(|| format!("creating {}", crypto.display()))?;
        let options = self
            .config
            .options_root()
            .join(as_of_date(now).format("%Y-%m-%d").to_string());
        fs::create_dir_all(&options).with_context(|| format!("creating {}", options.display()))?;
        Ok(())
    }

    /// Full run in the fixed step order.
    pub async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<RunReport> {
        self.prepare_dirs(now)?;
        let mut report = RunReport::default();

        self.sync_crypto(&self.config.crypto.symbols, now, &mut report).await;
        self.record_dominance(now, &mut report).await;

        let watchlist = self.watchlist.get_watchlist().await;
        self.snapshot_options(&watchlist, now, &mut report).await;
        report.notifications =
            notify_subscribers(&self.config.subscribers, self.sink, &watchlist).await;

        tracing::info!(
            synced = report.synced.len(),
            snapshots = report.snapshots.len(),
            failures = report.failures.len(),
            "run finished"
        );
        Ok(report)
    }

    /// Syncs each crypto ticker, isolating failures.
    pub async fn sync_crypto(
        &self,
        tickers: &[String],
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let store = DatasetStore::new(self.config.crypto_root());
        let step = self.config.crypto.sync_step.to_duration();
        let engine = SyncEngine::new(self.market, &store, step);
        for ticker in tickers {
            let provider_symbol = self.config.crypto.provider_symbol(ticker);
            match engine.sync(ticker, &provider_symbol, now).await {
                Ok(outcome) => report.synced.push((ticker.clone(), outcome)),
                Err(e) => report.fail(Step::Sync, ticker, e),
            }
        }
    }

    /// Appends one dominance sample.
    pub async fn record_dominance(&self, now: DateTime<Utc>, report: &mut RunReport) {
        let series = DominanceSeries::new(self.config.dominance_path());
        match record_dominance(self.snapshot, &series, &self.config.dominance, now).await {
            Ok(sample) => report.dominance = Some(sample),
            Err(e) => report.fail(Step::Dominance, &self.config.dominance.file_name, e),
        }
    }

    /// Writes today's option snapshot for each symbol, isolating failures.
    pub async fn snapshot_options(
        &self,
        symbols: &[String],
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let writer = SnapshotWriter::new(self.config.options_root());
        let options = &self.config.options;
        let fetcher = OptionChainFetcher::new(self.market, self.sleeper, options.retry_policy())
            .include_puts(options.include_puts);
        for symbol in symbols {
            match fetcher.fetch_and_write(&writer, symbol, now).await {
                Ok((path, _)) => report.snapshots.push(path),
                Err(e) => report.fail(Step::Options, symbol, e),
            }
        }
    }
}
