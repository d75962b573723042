//! Runtime configuration: TOML file, defaults, validation.
//!
//! Every field has a default, so an empty (or absent) file gives the stock
//! setup: BTC/ETH/ADA daily datasets, BTC dominance over the top 250 coins,
//! option snapshots for the fetched watchlist, and log-only notifications.
//!
//! ```toml
//! output_root = "output"
//! log_file = "status.log"
//!
//! [crypto]
//! symbols = ["BTC", "ETH"]
//! sync_step = "1D"
//!
//! [subscribers.Mike]
//! email = "mike.m@example.com"
//! watchlist = ["TSLA"]
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use market_data_ingestor::providers::coingecko::provider::MAX_PER_PAGE;
use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::env::get_env_var_or;

use crate::{
    notify::SubscriberDirectory,
    retry::RetryPolicy,
    timeframe::Timeframe,
    watchlist::normalize_symbols,
};

/// Environment variable holding the API key.
pub const API_KEY_VAR: &str = "API_KEY";

/// Value used when [`API_KEY_VAR`] is not set.
pub const API_KEY_PLACEHOLDER: &str = "secret_api_key_empty";

/// Longest accepted `crypto.sync_step`.
pub const MAX_SYNC_STEP_DAYS: i64 = 366;

#[derive(thiserror::Error, Debug)]
/// Configuration could not be loaded.
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    /// The file could not be read.
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    /// The file is not valid TOML for [`AppConfig`].
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    /// A value is out of range.
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Root of all generated files (`<root>/crypto`, `<root>/options`).
    pub output_root: PathBuf,
    /// Append logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Crypto price datasets.
    pub crypto: CryptoConfig,
    /// Dominance series.
    pub dominance: DominanceConfig,
    /// Option snapshots.
    pub options: OptionsConfig,
    /// Watchlist source.
    pub watchlist: WatchlistConfig,
    /// Notification settings.
    pub notify: NotifyConfig,
    /// Subscribers keyed by id.
    pub subscribers: SubscriberDirectory,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("output"),
            log_file: None,
            request_timeout_secs: 30,
            crypto: CryptoConfig::default(),
            dominance: DominanceConfig::default(),
            options: OptionsConfig::default(),
            watchlist: WatchlistConfig::default(),
            notify: NotifyConfig::default(),
            subscribers: SubscriberDirectory::new(),
        }
    }
}

/// Which crypto datasets to keep in sync.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CryptoConfig {
    /// Dataset tickers, e.g. `BTC`.
    pub symbols: Vec<String>,
    /// Quote currency appended for the provider symbol (`BTC` -> `BTC-USD`).
    pub quote: String,
    /// Spacing between consecutive rows.
    pub sync_step: Timeframe,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTC".into(), "ETH".into(), "ADA".into()],
            quote: "USD".into(),
            sync_step: Timeframe::day(),
        }
    }
}

impl CryptoConfig {
    /// Provider-side symbol of a dataset ticker.
    pub fn provider_symbol(&self, ticker: &str) -> String {
        format!("{ticker}-{}", self.quote)
    }
}

/// Dominance computation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DominanceConfig {
    /// Pricing currency of the snapshot.
    pub vs_currency: String,
    /// How many coins make up the total.
    pub top_n: u32,
    /// Provider id of the reference coin.
    pub reference_id: String,
    /// Series file name under the crypto directory.
    pub file_name: String,
}

impl Default for DominanceConfig {
    fn default() -> Self {
        Self {
            vs_currency: "usd".into(),
            top_n: 250,
            reference_id: "bitcoin".into(),
            file_name: "BTC.D.csv".into(),
        }
    }
}

/// Option snapshot settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsConfig {
    /// Include put contracts.
    pub include_puts: bool,
    /// Attempts per expiry.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub retry_delay_secs: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            include_puts: true,
            max_attempts: 3,
            retry_delay_secs: 5,
        }
    }
}

impl OptionsConfig {
    /// Retry policy for per-expiry requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

/// Watchlist source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchlistConfig {
    /// JSON endpoint returning the symbol list.
    pub url: String,
    /// Used when the endpoint cannot be reached.
    pub fallback: Vec<String>,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            url: "https://api.example.com/watchlist".into(),
            fallback: ["QQQ", "MSTR", "PLTR", "NVDA", "VST", "GOOG", "SOFI"]
                .map(String::from)
                .to_vec(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    /// Base URL of the per-symbol data link.
    pub link_base: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            link_base: "https://example.com".into(),
        }
    }
}

impl AppConfig {
    /// Parses and normalizes a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(s)?;
        cfg.normalized()
    }

    /// Loads `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                let text = fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)
            }
            None => AppConfig::default().normalized(),
        }
    }

    fn normalized(mut self) -> Result<Self, ConfigError> {
        self.crypto.symbols = normalize_symbols(&self.crypto.symbols);
        self.crypto.quote = self.crypto.quote.trim().to_uppercase();
        self.watchlist.fallback = normalize_symbols(&self.watchlist.fallback);
        for sub in self.subscribers.values_mut() {
            sub.watchlist = normalize_symbols(&sub.watchlist);
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be > 0".into()));
        }
        if self.crypto.sync_step.to_duration() > chrono::Duration::days(MAX_SYNC_STEP_DAYS) {
            return Err(ConfigError::Invalid(format!(
                "crypto.sync_step must be at most {MAX_SYNC_STEP_DAYS} days"
            )));
        }
        if self.crypto.quote.is_empty() {
            return Err(ConfigError::Invalid("crypto.quote must not be empty".into()));
        }
        if !(1..=MAX_PER_PAGE).contains(&self.dominance.top_n) {
            return Err(ConfigError::Invalid(format!(
                "dominance.top_n must be 1..={MAX_PER_PAGE}"
            )));
        }
        if self.dominance.reference_id.trim().is_empty() {
            return Err(ConfigError::Invalid("dominance.reference_id must not be empty".into()));
        }
        if self.options.max_attempts == 0 {
            return Err(ConfigError::Invalid("options.max_attempts must be > 0".into()));
        }
        Ok(self)
    }

    /// Per-request HTTP timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `<output_root>/crypto`
    pub fn crypto_root(&self) -> PathBuf {
        self.output_root.join("crypto")
    }

    /// `<output_root>/options`
    pub fn options_root(&self) -> PathBuf {
        self.output_root.join("options")
    }

    /// `<output_root>/crypto/<dominance.file_name>`
    pub fn dominance_path(&self) -> PathBuf {
        self.crypto_root().join(&self.dominance.file_name)
    }
}

/// API key from the environment, or the placeholder when unset.
///
/// Nothing sends this anywhere yet; it is loaded so deployments can keep
/// providing it.
pub fn api_key_from_env() -> SecretString {
    SecretString::from(get_env_var_or(API_KEY_VAR, API_KEY_PLACEHOLDER))
}
