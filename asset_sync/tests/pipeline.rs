mod common;

use asset_sync::{
    config::AppConfig,
    pipeline::{Pipeline, Step},
    sync::SyncOutcome,
};
use common::{
    FakeMarket, FakeSnapshot, FixedWatchlist, InstantSleeper, RecordingSink, chain, contract,
    daily_bars, date, utc,
};
use tempfile::TempDir;

fn config(root: &std::path::Path) -> AppConfig {
    let toml = format!(
        r#"
        output_root = "{}"

        [crypto]
        symbols = ["BTC", "ETH"]

        [options]
        retry_delay_secs = 0

        [subscribers.Arron]
        email = "arron.r@example.com"
        watchlist = ["MSTR", "GOOG"]

        [subscribers.Elaine]
        email = "elaine.e@example.com"
        watchlist = ["AAPL", "MSTR"]

        [subscribers.Mike]
        email = "mike.m@example.com"
        watchlist = ["TSLA"]
        "#,
        root.display().to_string().replace('\\', "/")
    );
    AppConfig::from_toml_str(&toml).unwrap()
}

fn snapshot() -> FakeSnapshot {
    FakeSnapshot::new(&[("bitcoin", Some(550.0)), ("ethereum", Some(450.0))])
}

#[tokio::test]
async fn failures_are_isolated_per_symbol() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path());
    let exp = date(2024, 6, 21);

    let mut broken = chain("MSTR", exp, &[1500.0], &[]);
    broken.calls.push(contract("garbage".into(), 1.0));
    let market = FakeMarket::default()
        .with_history("BTC-USD", daily_bars(date(2024, 5, 30), 5))
        .fail_history("ETH-USD")
        .with_chain("AAPL", exp, chain("AAPL", exp, &[190.0], &[180.0]))
        .with_chain("MSTR", exp, broken);
    market.set_clock(utc(2024, 6, 3, 12));

    let snap = snapshot();
    let watchlist = FixedWatchlist(vec!["AAPL".into(), "MSTR".into()]);
    let sink = RecordingSink::default();
    let sleeper = InstantSleeper::default();
    let pipeline = Pipeline::new(&cfg, &market, &snap, &watchlist, &sink, &sleeper);

    let report = pipeline.run(utc(2024, 6, 3, 12)).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(
        report.synced,
        vec![("BTC".to_string(), SyncOutcome::Bootstrapped { rows: 5 })]
    );
    let failed: Vec<(Step, &str)> = report
        .failures
        .iter()
        .map(|f| (f.step, f.target.as_str()))
        .collect();
    assert_eq!(failed, vec![(Step::Sync, "ETH"), (Step::Options, "MSTR")]);

    assert_eq!(report.dominance.map(|d| d.ratio), Some(55.0));
    assert!(cfg.crypto_root().join("BTC.csv").exists());
    assert!(!cfg.crypto_root().join("ETH.csv").exists());
    assert!(cfg.dominance_path().exists());
    assert_eq!(
        report.snapshots,
        vec![cfg.options_root().join("2024-06-03").join("OMON_AAPL_2024-06-03.csv")]
    );

    // notification covers the whole watchlist, including the symbol whose snapshot failed
    let deliveries = sink.deliveries.lock().unwrap().clone();
    assert_eq!(
        deliveries,
        vec![
            ("Arron".to_string(), "MSTR".to_string()),
            ("Elaine".to_string(), "AAPL".to_string()),
            ("Elaine".to_string(), "MSTR".to_string()),
        ]
    );
}

#[tokio::test]
async fn clean_run_succeeds_and_rerun_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let cfg = config(dir.path());
    let exp = date(2024, 6, 21);
    let market = FakeMarket::default()
        .with_history("BTC-USD", daily_bars(date(2024, 6, 1), 3))
        .with_history("ETH-USD", daily_bars(date(2024, 6, 1), 3))
        .with_chain("GOOG", exp, chain("GOOG", exp, &[170.0], &[]));
    let now = utc(2024, 6, 3, 12);
    market.set_clock(now);

    let snap = snapshot();
    let watchlist = FixedWatchlist(vec!["GOOG".into()]);
    let sink = RecordingSink::default();
    let sleeper = InstantSleeper::default();
    let pipeline = Pipeline::new(&cfg, &market, &snap, &watchlist, &sink, &sleeper);

    let first = pipeline.run(now).await.unwrap();
    assert!(first.is_success(), "{:?}", first.failures);
    assert!(cfg.options_root().join("2024-06-03").is_dir());
    let btc = std::fs::read(cfg.crypto_root().join("BTC.csv")).unwrap();
    let calls = market.history_calls();

    let second = pipeline.run(utc(2024, 6, 3, 18)).await.unwrap();
    assert!(second.is_success());
    assert_eq!(
        second.synced,
        vec![
            ("BTC".to_string(), SyncOutcome::UpToDate),
            ("ETH".to_string(), SyncOutcome::UpToDate),
        ]
    );
    assert_eq!(market.history_calls(), calls);
    assert_eq!(std::fs::read(cfg.crypto_root().join("BTC.csv")).unwrap(), btc);
    assert_eq!(
        std::fs::read_to_string(cfg.dominance_path()).unwrap().lines().count(),
        2
    );
}
