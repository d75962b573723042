use chrono::{DateTime, NaiveDate, Utc};

use crate::models::request_params::HistoryRange;

/// Daily bars with dividend and split events attached.
const INTERVAL: &str = "1d";
const EVENTS: &str = "div,splits";

/// Builds the query string for a chart request.
///
/// `Max` maps onto Yahoo's own `range=max`; `Since` becomes an explicit
/// `[period1, period2)` window ending at `now`.
pub fn chart_query(range: HistoryRange, now: DateTime<Utc>) -> Vec<(String, String)> {
    let mut query = vec![
        ("interval".to_string(), INTERVAL.to_string()),
        ("events".to_string(), EVENTS.to_string()),
        ("includeAdjustedClose".to_string(), "false".to_string()),
    ];

    match range {
        HistoryRange::Max => {
            query.push(("range".to_string(), "max".to_string()));
        }
        HistoryRange::Since { start } => {
            query.push(("period1".to_string(), start.timestamp().to_string()));
            query.push(("period2".to_string(), now.timestamp().to_string()));
        }
    }

    query
}

/// Yahoo addresses an expiry by the unix timestamp of its UTC midnight.
pub fn expiry_query(expiry: NaiveDate) -> Vec<(String, String)> {
    let ts = expiry.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
    vec![("date".to_string(), ts.to_string())]
}
