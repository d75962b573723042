mod common;

use std::fs;

use asset_sync::{
    config::DominanceConfig,
    dominance::{DominanceError, record_dominance},
    store::dominance::DominanceSeries,
};
use chrono::Duration;
use common::{FakeSnapshot, utc};
use tempfile::TempDir;

#[tokio::test]
async fn samples_accumulate_in_one_file() {
    let dir = TempDir::new().unwrap();
    let series = DominanceSeries::new(dir.path().join("crypto").join("BTC.D.csv"));
    let cfg = DominanceConfig::default();
    let client = FakeSnapshot::new(&[
        ("bitcoin", Some(500.0)),
        ("ethereum", Some(300.0)),
        ("solana", Some(200.0)),
    ]);

    let now = utc(2024, 6, 1, 9) + Duration::seconds(95);
    let first = record_dominance(&client, &series, &cfg, now).await.unwrap();
    assert_eq!(first.ratio, 50.0);
    record_dominance(&client, &series, &cfg, now + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(
        fs::read_to_string(series.path()).unwrap(),
        "2024-06-01 09:01,50.00\n2024-06-02 09:01,50.00\n"
    );
    let loaded = series.load().unwrap();
    assert!(loaded.iter().all(|s| (0.0..=100.0).contains(&s.ratio)));
}

#[tokio::test]
async fn top_n_limits_the_total() {
    let dir = TempDir::new().unwrap();
    let series = DominanceSeries::new(dir.path().join("BTC.D.csv"));
    let cfg = DominanceConfig {
        top_n: 2,
        ..DominanceConfig::default()
    };
    let client = FakeSnapshot::new(&[
        ("bitcoin", Some(600.0)),
        ("ethereum", Some(400.0)),
        ("solana", Some(1000.0)),
    ]);

    let sample = record_dominance(&client, &series, &cfg, utc(2024, 6, 1, 0)).await.unwrap();
    assert_eq!(sample.ratio, 60.0);
}

#[tokio::test]
async fn missing_reference_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let series = DominanceSeries::new(dir.path().join("BTC.D.csv"));
    let client = FakeSnapshot::new(&[("ethereum", Some(300.0))]);

    let err = record_dominance(&client, &series, &DominanceConfig::default(), utc(2024, 6, 1, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, DominanceError::MissingReference { .. }), "{err}");
    assert!(!series.path().exists());
}
