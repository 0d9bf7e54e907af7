//! Monitoring backend abstraction
//!
//! The poller only ever talks to a backend through [`MetricBackend`], so the
//! Zabbix adapter can be swapped for a scripted one in tests.

pub mod resolve;

use async_trait::async_trait;

pub use resolve::{resolve_item_ids, ResolveSummary};

/// Most recent observation of a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Observed value
    pub value: f64,
    /// Observation time (unix seconds)
    pub observed_at: i64,
}

impl Sample {
    pub fn new(value: f64, observed_at: i64) -> Self {
        Self { value, observed_at }
    }

    /// Age of the sample relative to `now` (unix seconds), zero if it is in the future
    pub fn age_secs(&self, now: i64) -> u64 {
        now.saturating_sub(self.observed_at).max(0) as u64
    }
}

/// Query side of a monitoring backend
#[async_trait]
pub trait MetricBackend: Send + Sync {
    /// Short human-readable backend name, used in outage notifications
    fn name(&self) -> &str {
        "backend"
    }

    /// Resolve a host/key pair to the backend's numeric item id.
    ///
    /// `Ok(None)` means the item does not exist.
    async fn resolve_id(&self, host: &str, key: &str) -> Result<Option<u64>, QueryError>;

    /// Fetch the latest sample for an item.
    ///
    /// `Ok(None)` means the backend answered but has no data for the item,
    /// which is distinct from a failed query.
    async fn fetch_latest(&self, item_id: u64) -> Result<Option<Sample>, QueryError>;
}

/// Backend query errors
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned status {0}")]
    Status(u16),

    #[error("RPC error {code}: {message} {data}")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },

    #[error("Malformed response: {0}")]
    Malformed(String),
}
