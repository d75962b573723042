use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much price history to request from a provider.
///
/// Providers return bars in ascending timestamp order and only for periods
/// that have already started.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRange {
    /// Everything the provider has.
    Max,

    /// Inclusive start, open end (through "now" at request time).
    Since {
        /// Inclusive start timestamp (UTC).
        start: DateTime<Utc>,
    },
}
