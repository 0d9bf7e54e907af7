//! Startup resolution of host/key pairs into backend item ids

use std::time::Duration;

use futures::StreamExt;

use super::MetricBackend;
use crate::config::Metric;

/// Outcome counts of a resolution pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub not_found: usize,
    pub failed: usize,
    /// Whether the pass was cut short by the deadline
    pub timed_out: bool,
}

impl ResolveSummary {
    /// Metrics that will be skipped every cycle
    pub fn unresolved(&self, total: usize) -> usize {
        total - self.resolved
    }
}

/// Resolve the item id of every metric, at most `concurrency` lookups at a time.
///
/// Lookups still pending when `timeout` elapses are abandoned and their
/// metrics stay unresolved. Errors only leave the affected metric unresolved.
pub async fn resolve_item_ids(
    backend: &dyn MetricBackend,
    metrics: &mut [Metric],
    concurrency: usize,
    timeout: Duration,
) -> ResolveSummary {
    let lookups: Vec<(usize, String, String)> = metrics
        .iter()
        .enumerate()
        .map(|(idx, m)| (idx, m.host.clone(), m.key.clone()))
        .collect();

    let mut results = futures::stream::iter(lookups)
        .map(|(idx, host, key)| async move {
            let outcome = backend.resolve_id(&host, &key).await;
            (idx, outcome)
        })
        .buffer_unordered(concurrency.max(1));

    let deadline = tokio::time::Instant::now() + timeout;
    let mut summary = ResolveSummary::default();

    loop {
        match tokio::time::timeout_at(deadline, results.next()).await {
            Ok(Some((idx, outcome))) => {
                let metric = &mut metrics[idx];
                match outcome {
                    Ok(Some(id)) => {
                        metric.item_id = Some(id);
                        summary.resolved += 1;
                        tracing::info!(host = %metric.host, key = %metric.key, item_id = id, "Resolved item");
                    }
                    Ok(None) => {
                        summary.not_found += 1;
                        tracing::warn!(host = %metric.host, key = %metric.key, "Item NOT FOUND");
                    }
                    Err(e) => {
                        summary.failed += 1;
                        tracing::error!(
                            host = %metric.host,
                            key = %metric.key,
                            error = %e,
                            "Resolve error"
                        );
                    }
                }
            }
            Ok(None) => break,
            Err(_) => {
                summary.timed_out = true;
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Item resolution timed out, remaining metrics stay unresolved"
                );
                break;
            }
        }
    }

    summary
}
