//! zabbix-alerter: threshold alerting for Zabbix metrics
//!
//! Polls the latest value of a fixed set of Zabbix items on a timer and sends
//! Telegram notifications when a value crosses its thresholds. Each metric
//! has a trigger and a clear threshold so a value hovering around one bound
//! does not flap.
//!
//! # Features
//!
//! - **Hysteresis**: MAX metrics alert high and clear low, MIN metrics the reverse
//! - **Deduplication**: one notification per state change, not per cycle
//! - **Missing data**: items that stop reporting raise a single OLD_VALUE alert
//! - **Outage detection**: a cycle with no data at all raises one backend-down alert
//! - **Bounded concurrency**: checks run on a fixed-size pool regardless of metric count
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zabbix_alerter::alerts::AlertStore;
//! use zabbix_alerter::config::{AlertMode, Metric, ZabbixSettings};
//! use zabbix_alerter::notify::LogNotifier;
//! use zabbix_alerter::poller::{MetricPoller, PollerConfig};
//! use zabbix_alerter::zabbix::ZabbixClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let zabbix = ZabbixClient::new(&ZabbixSettings {
//!     url: "https://zabbix.example.com/api_jsonrpc.php".to_string(),
//!     api_token: "token".to_string(),
//! })?;
//!
//! let metrics = vec![Metric::new("db01", "system.cpu.load", 90.0, 80.0, AlertMode::Max).with_item_id(23663)];
//!
//! let mut poller = MetricPoller::new(
//!     metrics,
//!     Arc::new(zabbix),
//!     Arc::new(LogNotifier::new()),
//!     Arc::new(AlertStore::new()),
//!     PollerConfig::default(),
//! );
//! poller.start();
//! tokio::signal::ctrl_c().await?;
//! poller.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod backend;
pub mod config;
pub mod notify;
pub mod poller;
pub mod zabbix;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use alerts::{AlertKey, AlertKind, AlertStore};
pub use backend::{MetricBackend, QueryError, Sample};
pub use config::{AlertMode, ConfigError, Metric};
pub use notify::{DeliveryError, NotificationSink};
pub use poller::{MetricPoller, PollerConfig};
