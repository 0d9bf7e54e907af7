//! Single metric check

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use dashmap::DashMap;

use super::hysteresis::{self, Transition};
use super::status::{format_timestamp, StatusCategory, StatusLine};
use crate::alerts::{AlertKind, AlertStore};
use crate::backend::{MetricBackend, Sample};
use crate::config::{AlertMode, Metric};
use crate::notify::{deliver, NotificationSink};

/// Everything a check reads or writes
pub(crate) struct CheckContext {
    pub(crate) backend: Arc<dyn MetricBackend>,
    pub(crate) sink: Arc<dyn NotificationSink>,
    pub(crate) store: Arc<AlertStore>,
    /// Last good value per item, only used for display
    pub(crate) last_values: DashMap<u64, f64>,
    pub(crate) stale_after: Option<Duration>,
}

impl CheckContext {
    /// Query one metric, apply the alert policy and describe the outcome.
    ///
    /// Increments `successes` as soon as a usable sample arrives.
    pub(crate) async fn check_metric(
        &self,
        metric: &Metric,
        item_id: u64,
        now: DateTime<Local>,
        successes: &AtomicUsize,
    ) -> StatusLine {
        let ts = format_timestamp(&now);

        let sample = match self.backend.fetch_latest(item_id).await {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(
                    host = %metric.host,
                    key = %metric.key,
                    item_id,
                    error = %e,
                    "Metric query failed"
                );
                return StatusLine::new(&ts, StatusCategory::Error, metric, e.to_string());
            }
        };

        let Some(sample) = sample.filter(|s| self.is_fresh(metric, s, now.timestamp())) else {
            return self.on_no_data(metric, item_id, &ts).await;
        };

        successes.fetch_add(1, Ordering::SeqCst);
        let line = self.on_sample(metric, item_id, sample.value, &ts).await;
        self.restore_global(metric).await;
        line
    }

    fn is_fresh(&self, metric: &Metric, sample: &Sample, now: i64) -> bool {
        let Some(limit) = self.stale_after else {
            return true;
        };
        let age = sample.age_secs(now);
        if age < limit.as_secs() {
            return true;
        }
        tracing::debug!(host = %metric.host, key = %metric.key, age_secs = age, "Sample is stale");
        false
    }

    async fn on_no_data(&self, metric: &Metric, item_id: u64, ts: &str) -> StatusLine {
        let previous = self.last_values.remove(&item_id).map(|(_, v)| v);

        if !self.store.was_alerted(item_id, AlertKind::OldValue) {
            self.store.set_alert(item_id, AlertKind::OldValue);
            tracing::warn!(
                host = %metric.host,
                key = %metric.key,
                item_id,
                kind = AlertKind::OldValue.as_str(),
                "Alert raised"
            );
            deliver(
                self.sink.as_ref(),
                &format!("OLD_VALUE: {} {}", metric.host, metric.key),
            )
            .await;
        }

        let details = match previous {
            Some(v) => format!("no data, last value {}", v),
            None => "no data".to_string(),
        };
        StatusLine::new(ts, StatusCategory::NoData, metric, details)
    }

    async fn on_sample(&self, metric: &Metric, item_id: u64, value: f64, ts: &str) -> StatusLine {
        self.last_values.insert(item_id, value);

        if self.store.was_alerted(item_id, AlertKind::OldValue) {
            self.store.clear_alert(item_id);
            deliver(
                self.sink.as_ref(),
                &format!("Value resumed: {} {} v={}", metric.host, metric.key, value),
            )
            .await;
        }

        let active = self.store.get_alert(item_id);
        let mode = metric.alert_type.as_str();

        match hysteresis::evaluate(metric, value, active) {
            Transition::Fire(kind) => {
                self.store.set_alert(item_id, kind);
                tracing::warn!(
                    host = %metric.host,
                    key = %metric.key,
                    item_id,
                    kind = kind.as_str(),
                    value,
                    "Alert raised"
                );
                deliver(
                    self.sink.as_ref(),
                    &format!("ALERT {}: {} {} {}", mode, metric.host, metric.key, value),
                )
                .await;

                let (category, details) = match metric.alert_type {
                    AlertMode::Max => (
                        StatusCategory::AlertMax,
                        format!("v={} >= {}", value, metric.threshold_high),
                    ),
                    AlertMode::Min => (
                        StatusCategory::AlertMin,
                        format!("v={} <= {}", value, metric.threshold_low),
                    ),
                };
                StatusLine::new(ts, category, metric, details)
            }
            Transition::Clear(kind) => {
                self.store.clear_alert(item_id);
                tracing::info!(
                    host = %metric.host,
                    key = %metric.key,
                    item_id,
                    kind = kind.as_str(),
                    value,
                    "Alert cleared"
                );
                deliver(
                    self.sink.as_ref(),
                    &format!("CLEAR {}: {} {} v={}", mode, metric.host, metric.key, value),
                )
                .await;

                let details = match metric.alert_type {
                    AlertMode::Max => format!("v={} <= {}", value, metric.threshold_low),
                    AlertMode::Min => format!("v={} >= {}", value, metric.threshold_high),
                };
                StatusLine::new(ts, StatusCategory::Clear, metric, details)
            }
            Transition::Hold => match active {
                Some(AlertKind::Over) => StatusLine::new(
                    ts,
                    StatusCategory::AlertMaxOngoing,
                    metric,
                    format!("ongoing, value={}", value),
                ),
                Some(AlertKind::Under) => StatusLine::new(
                    ts,
                    StatusCategory::AlertMinOngoing,
                    metric,
                    format!("ongoing, value={}", value),
                ),
                _ => StatusLine::new(ts, StatusCategory::Ok, metric, value.to_string()),
            },
        }
    }

    /// Clear the global outage after any successful check
    async fn restore_global(&self, metric: &Metric) {
        if !self.store.is_global_down() {
            return;
        }
        self.store.clear_global_down();
        tracing::info!(host = %metric.host, "{} connection restored", self.backend.name());
        deliver(
            self.sink.as_ref(),
            &format!("{} connection restored ({})", self.backend.name(), metric.host),
        )
        .await;
    }
}
