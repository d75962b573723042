use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::{
    models::{
        bar::PriceBar,
        options::{OptionChain, OptionContract},
    },
    providers::{ApiSnafu, InternalSnafu, ProviderError, ValidationSnafu},
};

// ---- v8 chart API ----

#[derive(Deserialize, Debug)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<YahooErrorBody>,
}

#[derive(Deserialize, Debug)]
pub struct YahooErrorBody {
    pub code: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
    #[serde(default)]
    pub events: Option<ChartEvents>,
}

#[derive(Deserialize, Debug)]
pub struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    pub gmtoffset: i32,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChartEvents {
    #[serde(default)]
    pub dividends: IndexMap<String, DividendEvent>,
    #[serde(default)]
    pub splits: IndexMap<String, SplitEvent>,
}

#[derive(Deserialize, Debug)]
pub struct DividendEvent {
    pub amount: f64,
    pub date: i64,
}

#[derive(Deserialize, Debug)]
pub struct SplitEvent {
    pub numerator: f64,
    pub denominator: f64,
    pub date: i64,
}

fn unwrap_envelope<T>(
    symbol: &str,
    result: Option<Vec<T>>,
    error: Option<YahooErrorBody>,
) -> Result<T, ProviderError> {
    if let Some(err) = error {
        if err.code == "Not Found" {
            return ValidationSnafu {
                message: format!("symbol not found: {symbol}"),
            }
            .fail();
        }
        return ApiSnafu {
            status: 200u16,
            message: format!("{}: {}", err.code, err.description),
        }
        .fail();
    }

    result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| {
            InternalSnafu {
                message: format!("empty result for {symbol}"),
            }
            .build()
        })
}

impl ChartResponse {
    /// Converts the payload into ascending daily bars.
    ///
    /// Bar timestamps are normalised to midnight in the exchange's offset, the
    /// same way the dataset files index them. Periods where every OHLCV field
    /// is null (holidays, halted sessions) are skipped.
    pub fn into_bars(self, symbol: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let result = unwrap_envelope(symbol, self.chart.result, self.chart.error)?;

        let offset = FixedOffset::east_opt(result.meta.gmtoffset).ok_or_else(|| {
            InternalSnafu {
                message: format!("invalid gmtoffset {} for {symbol}", result.meta.gmtoffset),
            }
            .build()
        })?;

        let events = result.events.unwrap_or_default();
        let mut dividends: HashMap<NaiveDate, f64> = HashMap::new();
        for ev in events.dividends.values() {
            dividends.insert(local_date(ev.date, offset, symbol)?, ev.amount);
        }
        let mut splits: HashMap<NaiveDate, f64> = HashMap::new();
        for ev in events.splits.values() {
            if ev.denominator != 0.0 {
                splits.insert(local_date(ev.date, offset, symbol)?, ev.numerator / ev.denominator);
            }
        }

        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let at = |v: &Vec<Option<f64>>, i: usize| v.get(i).copied().flatten();

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let (open, high, low, close, volume) = (
                at(&quote.open, i),
                at(&quote.high, i),
                at(&quote.low, i),
                at(&quote.close, i),
                at(&quote.volume, i),
            );
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            let day = local_date(ts, offset, symbol)?;
            let timestamp = day
                .and_time(NaiveTime::MIN)
                .and_local_timezone(offset)
                .single()
                .ok_or_else(|| {
                    InternalSnafu {
                        message: format!("cannot place {day} in offset {offset} for {symbol}"),
                    }
                    .build()
                })?;

            bars.push(PriceBar {
                timestamp,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0.0),
                dividends: dividends.get(&day).copied().unwrap_or(0.0),
                stock_splits: splits.get(&day).copied().unwrap_or(0.0),
            });
        }

        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

fn utc_from_unix(ts: i64, symbol: &str) -> Result<DateTime<Utc>, ProviderError> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| {
        InternalSnafu {
            message: format!("invalid timestamp {ts} for {symbol}"),
        }
        .build()
    })
}

fn local_date(ts: i64, offset: FixedOffset, symbol: &str) -> Result<NaiveDate, ProviderError> {
    Ok(utc_from_unix(ts, symbol)?.with_timezone(&offset).date_naive())
}

// ---- v7 options API ----

#[derive(Deserialize, Debug)]
pub struct OptionsResponse {
    #[serde(rename = "optionChain")]
    pub option_chain: OptionsEnvelope,
}

#[derive(Deserialize, Debug)]
pub struct OptionsEnvelope {
    pub result: Option<Vec<OptionsResult>>,
    pub error: Option<YahooErrorBody>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResult {
    #[serde(default)]
    pub expiration_dates: Vec<i64>,
    #[serde(default)]
    pub options: Vec<OptionsBlock>,
}

#[derive(Deserialize, Debug)]
pub struct OptionsBlock {
    #[serde(default)]
    pub calls: Vec<YahooContract>,
    #[serde(default)]
    pub puts: Vec<YahooContract>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct YahooContract {
    pub contract_symbol: String,
    pub strike: f64,
    pub currency: Option<String>,
    pub last_price: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub contract_size: Option<String>,
    pub last_trade_date: Option<i64>,
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub in_the_money: bool,
}

impl YahooContract {
    fn into_contract(self) -> OptionContract {
        OptionContract {
            last_trade_date: self
                .last_trade_date
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            contract_symbol: self.contract_symbol,
            strike: self.strike,
            last_price: self.last_price,
            bid: self.bid,
            ask: self.ask,
            change: self.change,
            percent_change: self.percent_change,
            volume: self.volume,
            open_interest: self.open_interest,
            implied_volatility: self.implied_volatility,
            in_the_money: self.in_the_money,
            contract_size: self.contract_size,
            currency: self.currency,
        }
    }
}

impl OptionsResponse {
    /// Expiry dates listed for the underlying, ascending.
    pub fn into_expiries(self, symbol: &str) -> Result<Vec<NaiveDate>, ProviderError> {
        let result = unwrap_envelope(symbol, self.option_chain.result, self.option_chain.error)?;
        let mut dates = result
            .expiration_dates
            .into_iter()
            .map(|ts| utc_from_unix(ts, symbol).map(|dt| dt.date_naive()))
            .collect::<Result<Vec<_>, _>>()?;
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// The chain for the requested expiry. An expiry with no block yields an
    /// empty chain rather than an error.
    pub fn into_chain(self, symbol: &str) -> Result<OptionChain, ProviderError> {
        let result = unwrap_envelope(symbol, self.option_chain.result, self.option_chain.error)?;
        let Some(block) = result.options.into_iter().next() else {
            return Ok(OptionChain::default());
        };
        Ok(OptionChain {
            calls: block.calls.into_iter().map(YahooContract::into_contract).collect(),
            puts: block.puts.into_iter().map(YahooContract::into_contract).collect(),
        })
    }
}
