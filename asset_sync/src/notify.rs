//! Subscriber notifications for watchlist activity.
//!
//! Every symbol handed to [`notify_subscribers`] counts as "unusual activity".
//! Each subscriber watching one of those symbols gets one notification per
//! matching symbol through a [`NotificationSink`].

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A person who wants to hear about some symbols.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Subscriber {
    /// Contact address.
    pub email: String,
    /// Symbols of interest.
    #[serde(default)]
    pub watchlist: Vec<String>,
}

/// Subscribers keyed by id (e.g. first name), in configuration order.
pub type SubscriberDirectory = IndexMap<String, Subscriber>;

#[derive(thiserror::Error, Debug)]
/// A single delivery failed.
pub enum NotifyError {
    #[error("delivery to {recipient} failed: {reason}")]
    /// The sink rejected or could not send the message.
    Delivery {
        /// Address the message was meant for.
        recipient: String,
        /// What went wrong.
        reason: String,
    },
}

/// Delivers one notification.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Tells `subscriber` that `symbol` shows activity.
    async fn deliver(
        &self,
        id: &str,
        subscriber: &Subscriber,
        symbol: &str,
    ) -> Result<(), NotifyError>;
}

/// Stand-in for e-mail: logs the message and the data link.
#[derive(Debug, Clone)]
pub struct LogSink {
    link_base: String,
}

impl LogSink {
    /// Sink that links to `<link_base>/<SYMBOL>`.
    pub fn new(link_base: impl Into<String>) -> Self {
        Self {
            link_base: link_base.into(),
        }
    }

    /// Data link for `symbol`.
    pub fn link_for(&self, symbol: &str) -> String {
        format!("{}/{symbol}", self.link_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(
        &self,
        id: &str,
        subscriber: &Subscriber,
        symbol: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            subscriber = id,
            email = %subscriber.email,
            symbol,
            link = %self.link_for(symbol),
            "unusual activity notification"
        );
        Ok(())
    }
}

/// Deliveries made by one [`notify_subscribers`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// `(subscriber id, symbol)` pairs delivered.
    pub delivered: Vec<(String, String)>,
    /// `(subscriber id, symbol)` pairs whose delivery failed.
    pub failed: Vec<(String, String)>,
}

/// Notifies every subscriber about each of `symbols` on their watchlist.
///
/// Matching ignores case. A failed delivery is logged and the remaining
/// deliveries still go out.
pub async fn notify_subscribers(
    directory: &SubscriberDirectory,
    sink: &dyn NotificationSink,
    symbols: &[String],
) -> NotifyReport {
    let mut report = NotifyReport::default();
    if symbols.is_empty() {
        tracing::info!("no activity to notify");
        return report;
    }

    for (id, subscriber) in directory {
        for symbol in symbols {
            if !subscriber.watchlist.iter().any(|w| w.eq_ignore_ascii_case(symbol)) {
                continue;
            }
            match sink.deliver(id, subscriber, symbol).await {
                Ok(()) => report.delivered.push((id.clone(), symbol.clone())),
                Err(e) => {
                    tracing::error!(
                        subscriber = %id,
                        symbol = %symbol,
                        error = %e,
                        "notification failed"
                    );
                    report.failed.push((id.clone(), symbol.clone()));
                }
            }
        }
    }
    tracing::info!(
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "notifications sent"
    );
    report
}
