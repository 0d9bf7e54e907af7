//! Dual-threshold alert policy
//!
//! A MAX metric fires at `value >= threshold_high` and clears only once it
//! has dropped to `value <= threshold_low`; a MIN metric mirrors that. Values
//! strictly between the two bounds keep whatever state the metric is in.

use crate::alerts::AlertKind;
use crate::config::{AlertMode, Metric};

/// Edge produced by one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Record the kind and notify
    Fire(AlertKind),
    /// Remove the kind and notify
    Clear(AlertKind),
    /// No edge
    Hold,
}

/// Alert kind a metric raises when it crosses its trigger threshold
pub fn alert_kind(mode: AlertMode) -> AlertKind {
    match mode {
        AlertMode::Max => AlertKind::Over,
        AlertMode::Min => AlertKind::Under,
    }
}

/// Decide the edge for `value` given the metric's currently recorded alert.
///
/// The trigger condition is checked before the clear condition, so one
/// sample yields at most one edge.
pub fn evaluate(metric: &Metric, value: f64, active: Option<AlertKind>) -> Transition {
    let kind = alert_kind(metric.alert_type);
    let alerted = active == Some(kind);

    let (triggered, cleared) = match metric.alert_type {
        AlertMode::Max => (value >= metric.threshold_high, value <= metric.threshold_low),
        AlertMode::Min => (value <= metric.threshold_low, value >= metric.threshold_high),
    };

    if triggered && !alerted {
        Transition::Fire(kind)
    } else if cleared && alerted {
        Transition::Clear(kind)
    } else {
        Transition::Hold
    }
}
