//! Timeframe utilities for expressing the sync step between dataset rows.
//!
//! A [`Timeframe`] pairs a non-zero amount with a [`TimeframeUnit`] (minute,
//! hour, day, week). The incremental sync adds one timeframe to the last
//! stored timestamp to find the first period it still needs, so daily
//! datasets use `1D` while an intraday provider would use e.g. `15m`.
//!
//! Typical usage:
//! ```
//! use asset_sync::timeframe::{Timeframe, TimeframeUnit};
//!
//! let tf: Timeframe = "15m".parse().unwrap();
//! assert_eq!(tf.amount().get(), 15);
//! assert_eq!(tf.unit(), TimeframeUnit::Minute);
//! assert_eq!(tf.to_duration(), chrono::Duration::minutes(15));
//! ```

use std::{fmt, num::NonZeroU32, str::FromStr};

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

/// Timeframe granularity. Months are not supported since they have no fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeframeUnit {
    /// UTC minute
    Minute,
    /// UTC hour
    Hour,
    /// Calendar day
    Day,
    /// Seven calendar days
    Week,
}

/// A timeframe = amount × unit (e.g., 5-Minute, 3-Hour, 1-Day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    amount: NonZeroU32,
    unit: TimeframeUnit,
}

impl Timeframe {
    /// Create a new Timeframe
    pub const fn new(amount: NonZeroU32, unit: TimeframeUnit) -> Self {
        Self { amount, unit }
    }

    /// One calendar day, the native granularity of the daily datasets.
    pub const fn day() -> Self {
        Self::new(NonZeroU32::MIN, TimeframeUnit::Day)
    }

    /// Magnitude component.
    pub const fn amount(&self) -> NonZeroU32 {
        self.amount
    }

    /// Unit component.
    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Length of one step as a chrono duration.
    pub fn to_duration(&self) -> chrono::Duration {
        let n = i64::from(self.amount.get());
        match self.unit {
            TimeframeUnit::Minute => chrono::Duration::minutes(n),
            TimeframeUnit::Hour => chrono::Duration::hours(n),
            TimeframeUnit::Day => chrono::Duration::days(n),
            TimeframeUnit::Week => chrono::Duration::weeks(n),
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::day()
    }
}

/// Display/parse for config and CLI ergonomics (`"5m"`, `"1h"`, `"1D"`, `"1W"`)
impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.amount.get();
        let u = match self.unit {
            TimeframeUnit::Minute => "m",
            TimeframeUnit::Hour => "h",
            TimeframeUnit::Day => "D",
            TimeframeUnit::Week => "W",
        };
        write!(f, "{a}{u}")
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // very small parser: 5m / 3h / 1D / 1W
        let s = s.trim();
        if s.is_empty() {
            bail!("empty timeframe");
        }
        let Some((unit_at, _)) = s.char_indices().last() else {
            bail!("empty timeframe");
        };
        let (digits, unit) = s.split_at(unit_at);
        let amount_num: u32 = digits
            .parse()
            .map_err(|_| anyhow!("bad timeframe amount in {s:?}"))?;
        let amount = NonZeroU32::new(amount_num).ok_or_else(|| anyhow!("amount must be > 0"))?;
        let unit = match unit {
            "m" => TimeframeUnit::Minute,
            "h" => TimeframeUnit::Hour,
            "D" | "d" => TimeframeUnit::Day,
            "W" | "w" => TimeframeUnit::Week,
            "M" => bail!("month steps have no fixed length; use days instead"),
            _ => bail!("unknown unit: {unit}"),
        };
        Ok(Timeframe::new(amount, unit))
    }
}

impl TryFrom<String> for Timeframe {
    type Error = anyhow::Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip_for_each_unit() {
        for s in ["5m", "3h", "1D", "2W"] {
            let tf: Timeframe = s.parse().unwrap();
            assert_eq!(tf.to_string(), s);
        }
    }

    #[test]
    fn lowercase_day_is_accepted() {
        let tf: Timeframe = "1d".parse().unwrap();
        assert_eq!(tf, Timeframe::day());
        assert_eq!(tf.to_duration(), chrono::Duration::days(1));
    }

    #[test]
    fn rejects_zero_months_and_garbage() {
        assert!("0D".parse::<Timeframe>().is_err());
        assert!("1M".parse::<Timeframe>().is_err());
        assert!("D".parse::<Timeframe>().is_err());
        assert!("".parse::<Timeframe>().is_err());
        assert!("5x".parse::<Timeframe>().is_err());
        assert!("1é".parse::<Timeframe>().is_err());
        assert!("é".parse::<Timeframe>().is_err());
    }

    #[test]
    fn deserializes_from_toml_string() {
        #[derive(Deserialize)]
        struct Wrap {
            step: Timeframe,
        }
        let w: Wrap = toml::from_str(r#"step = "1h""#).unwrap();
        assert_eq!(w.step.to_duration(), chrono::Duration::hours(1));
    }
}
