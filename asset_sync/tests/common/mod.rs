#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use asset_sync::{
    notify::{NotificationSink, NotifyError, Subscriber},
    retry::Sleeper,
    watchlist::WatchlistProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use market_data_ingestor::{
    models::{
        bar::PriceBar,
        market::CoinMarketCap,
        options::{OptionChain, OptionContract},
        request_params::HistoryRange,
    },
    providers::{ApiSnafu, MarketDataClient, MarketSnapshotClient, ProviderError},
};

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// `n` consecutive daily bars starting at midnight UTC of `first`.
pub fn daily_bars(first: NaiveDate, n: usize) -> Vec<PriceBar> {
    let offset = FixedOffset::east_opt(0).unwrap();
    (0..n)
        .map(|i| {
            let day = first + chrono::Duration::days(i as i64);
            let ts = offset
                .with_ymd_and_hms(day.year(), day.month(), day.day(), 0, 0, 0)
                .unwrap();
            let px = 100.0 + i as f64;
            PriceBar {
                timestamp: ts,
                open: px,
                high: px + 1.5,
                low: px - 1.5,
                close: px + 0.25,
                volume: 1_000.0 * (i as f64 + 1.0),
                dividends: 0.0,
                stock_splits: 0.0,
            }
        })
        .collect()
}

/// OCC-style contract symbol for `root`.
pub fn occ(root: &str, expiry: NaiveDate, kind: char, strike: f64) -> String {
    format!(
        "{root}{}{kind}{:08}",
        expiry.format("%y%m%d"),
        (strike * 1000.0).round() as u64
    )
}

pub fn contract(symbol: String, strike: f64) -> OptionContract {
    OptionContract {
        contract_symbol: symbol,
        last_trade_date: Some(utc(2024, 6, 3, 15)),
        strike,
        last_price: Some(1.25),
        bid: Some(1.2),
        ask: Some(1.3),
        change: Some(0.1),
        percent_change: Some(8.7),
        volume: Some(12),
        open_interest: Some(340),
        implied_volatility: Some(0.42),
        in_the_money: false,
        contract_size: Some("REGULAR".into()),
        currency: Some("USD".into()),
    }
}

pub fn chain(
    root: &str,
    expiry: NaiveDate,
    call_strikes: &[f64],
    put_strikes: &[f64],
) -> OptionChain {
    OptionChain {
        calls: call_strikes
            .iter()
            .map(|&k| contract(occ(root, expiry, 'C', k), k))
            .collect(),
        puts: put_strikes
            .iter()
            .map(|&k| contract(occ(root, expiry, 'P', k), k))
            .collect(),
    }
}

fn unavailable() -> ProviderError {
    ApiSnafu {
        status: 503u16,
        message: "unavailable",
    }
    .build()
}

/// In-memory provider. History requests only see bars whose timestamp is
/// not after the fake clock.
#[derive(Default)]
pub struct FakeMarket {
    history: Mutex<HashMap<String, Vec<PriceBar>>>,
    clock: Mutex<Option<DateTime<Utc>>>,
    /// Extra rows returned before `start` on incremental requests.
    overlap: Mutex<usize>,
    failing_history: Mutex<HashSet<String>>,
    expiries: Mutex<HashMap<String, Vec<NaiveDate>>>,
    chains: Mutex<HashMap<(String, NaiveDate), OptionChain>>,
    failing_expiries: Mutex<HashSet<(String, NaiveDate)>>,
    pub history_calls: AtomicUsize,
    pub ranges: Mutex<Vec<(String, HistoryRange)>>,
    pub chain_calls: Mutex<Vec<(String, NaiveDate)>>,
}

impl FakeMarket {
    pub fn with_history(self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.history.lock().unwrap().insert(symbol.to_string(), bars);
        self
    }

    pub fn set_clock(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = Some(now);
    }

    pub fn set_overlap(&self, rows: usize) {
        *self.overlap.lock().unwrap() = rows;
    }

    pub fn fail_history(self, symbol: &str) -> Self {
        self.failing_history.lock().unwrap().insert(symbol.to_string());
        self
    }

    pub fn with_chain(self, symbol: &str, expiry: NaiveDate, chain: OptionChain) -> Self {
        self.expiries
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push(expiry);
        self.chains
            .lock()
            .unwrap()
            .insert((symbol.to_string(), expiry), chain);
        self
    }

    /// Swaps the chain served for an already listed expiry.
    pub fn replace_chain(&self, symbol: &str, expiry: NaiveDate, chain: OptionChain) {
        self.chains
            .lock()
            .unwrap()
            .insert((symbol.to_string(), expiry), chain);
    }

    pub fn fail_expiry(self, symbol: &str, expiry: NaiveDate) -> Self {
        self.expiries
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .push(expiry);
        self.failing_expiries
            .lock()
            .unwrap()
            .insert((symbol.to_string(), expiry));
        self
    }

    pub fn calls_for(&self, symbol: &str, expiry: NaiveDate) -> usize {
        self.chain_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, e)| s == symbol && *e == expiry)
            .count()
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataClient for FakeMarket {
    async fn get_price_history(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.ranges.lock().unwrap().push((symbol.to_string(), range));
        if self.failing_history.lock().unwrap().contains(symbol) {
            return Err(unavailable());
        }

        let clock = *self.clock.lock().unwrap();
        let visible: Vec<PriceBar> = self
            .history
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| clock.is_none_or(|now| b.timestamp.with_timezone(&Utc) <= now))
            .collect();

        Ok(match range {
            HistoryRange::Max => visible,
            HistoryRange::Since { start } => {
                let first = visible
                    .iter()
                    .position(|b| b.timestamp.with_timezone(&Utc) >= start)
                    .unwrap_or(visible.len());
                let from = first.saturating_sub(*self.overlap.lock().unwrap());
                visible[from..].to_vec()
            }
        })
    }

    async fn list_expiries(&self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        Ok(self
            .expiries
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_option_chain(
        &self,
        symbol: &str,
        expiry: NaiveDate,
    ) -> Result<OptionChain, ProviderError> {
        self.chain_calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), expiry));
        if self
            .failing_expiries
            .lock()
            .unwrap()
            .contains(&(symbol.to_string(), expiry))
        {
            return Err(unavailable());
        }
        Ok(self
            .chains
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), expiry))
            .cloned()
            .unwrap_or_default())
    }
}

pub struct FakeSnapshot {
    pub coins: Vec<CoinMarketCap>,
}

impl FakeSnapshot {
    pub fn new(caps: &[(&str, Option<f64>)]) -> Self {
        Self {
            coins: caps
                .iter()
                .map(|(id, cap)| CoinMarketCap {
                    id: id.to_string(),
                    symbol: String::new(),
                    market_cap: *cap,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl MarketSnapshotClient for FakeSnapshot {
    async fn get_market_snapshot(
        &self,
        _vs_currency: &str,
        top_n: u32,
    ) -> Result<Vec<CoinMarketCap>, ProviderError> {
        Ok(self.coins.iter().take(top_n as usize).cloned().collect())
    }
}

#[derive(Default)]
pub struct InstantSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

pub struct FixedWatchlist(pub Vec<String>);

#[async_trait]
impl WatchlistProvider for FixedWatchlist {
    async fn get_watchlist(&self) -> Vec<String> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub deliveries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, id: &str, _s: &Subscriber, symbol: &str) -> Result<(), NotifyError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((id.to_string(), symbol.to_string()));
        Ok(())
    }
}
