//! Flattened option snapshot rows and contract symbol parsing.

use std::{cmp::Ordering, fmt, sync::LazyLock};

use chrono::NaiveDate;
use market_data_ingestor::models::options::OptionContract;
use regex::Regex;
use serde::Serialize;

// <root><YYMMDD><C|P><strike*1000, zero padded>
static CONTRACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)(\d{6})([CP])(\d+)").expect("valid regex"));

/// Call or put, as encoded in the contract symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OptionType {
    /// Call
    #[serde(rename = "C")]
    Call,
    /// Put
    #[serde(rename = "P")]
    Put,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        })
    }
}

/// Extracts the option type from an OCC-style contract symbol
/// (e.g. `AAPL240621C00190000` -> [`OptionType::Call`]).
pub fn parse_option_type(contract_symbol: &str) -> Option<OptionType> {
    let caps = CONTRACT_RE.captures(contract_symbol)?;
    match &caps[3] {
        "C" => Some(OptionType::Call),
        "P" => Some(OptionType::Put),
        _ => None,
    }
}

/// One line of a snapshot file.
///
/// Provider noise (`change`, `percentChange`, `contractSize`, `currency`) is
/// not carried over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    /// OCC-style contract symbol.
    pub contract_symbol: String,
    /// Last trade time, `YYYY-MM-DD HH:MM:SS+0000`.
    pub last_trade_date: Option<String>,
    /// Strike price.
    pub strike: f64,
    /// Last traded price.
    pub last_price: Option<f64>,
    /// Best bid.
    pub bid: Option<f64>,
    /// Best ask.
    pub ask: Option<f64>,
    /// Contracts traded today.
    pub volume: Option<u64>,
    /// Open contracts.
    pub open_interest: Option<u64>,
    /// Implied volatility as a fraction.
    pub implied_volatility: Option<f64>,
    /// Whether the contract is in the money.
    pub in_the_money: bool,
    /// Expiry date the chain was requested for.
    pub expiry: NaiveDate,
    /// Parsed from the contract symbol.
    pub option_type: OptionType,
}

impl SnapshotRow {
    /// Builds a row, or returns `None` when the contract symbol cannot be parsed.
    pub fn from_contract(contract: OptionContract, expiry: NaiveDate) -> Option<Self> {
        let option_type = parse_option_type(&contract.contract_symbol)?;
        Some(Self {
            last_trade_date: contract
                .last_trade_date
                .map(|t| t.format("%Y-%m-%d %H:%M:%S%z").to_string()),
            contract_symbol: contract.contract_symbol,
            strike: contract.strike,
            last_price: contract.last_price,
            bid: contract.bid,
            ask: contract.ask,
            volume: contract.volume,
            open_interest: contract.open_interest,
            implied_volatility: contract.implied_volatility,
            in_the_money: contract.in_the_money,
            expiry,
            option_type,
        })
    }

    /// Snapshot order: option type, then expiry, then strike.
    pub fn snapshot_order(a: &Self, b: &Self) -> Ordering {
        a.option_type
            .cmp(&b.option_type)
            .then(a.expiry.cmp(&b.expiry))
            .then(a.strike.total_cmp(&b.strike))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_calls_and_puts() {
        assert_eq!(parse_option_type("AAPL240621C00190000"), Some(OptionType::Call));
        assert_eq!(parse_option_type("MSTR250117P01500000"), Some(OptionType::Put));
        assert_eq!(parse_option_type("AAPL240621X00190000"), None);
        assert_eq!(parse_option_type("AAPL"), None);
    }

    #[test]
    fn symbol_must_start_with_the_root() {
        assert_eq!(parse_option_type("1AAPL240621C00190000"), None);
        assert_eq!(parse_option_type(" AAPL240621C00190000"), None);
        assert_eq!(parse_option_type("-X240621P00005000"), None);
    }

    #[test]
    fn calls_sort_before_puts() {
        assert!(OptionType::Call < OptionType::Put);
        assert_eq!(OptionType::Put.to_string(), "P");
    }
}
