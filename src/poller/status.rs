//! Console status lines

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Timelike};

use crate::config::Metric;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of one metric in one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Skip,
    NoData,
    /// MAX alert fired this cycle
    AlertMax,
    /// MIN alert fired this cycle
    AlertMin,
    /// MAX alert still active, no edge this cycle
    AlertMaxOngoing,
    /// MIN alert still active, no edge this cycle
    AlertMinOngoing,
    Clear,
    Ok,
    Error,
}

impl StatusCategory {
    /// Tag printed between brackets
    pub fn label(&self) -> &'static str {
        match self {
            StatusCategory::Skip => "SKIP",
            StatusCategory::NoData => "NO DATA",
            StatusCategory::AlertMax | StatusCategory::AlertMaxOngoing => "ALERT MAX",
            StatusCategory::AlertMin | StatusCategory::AlertMinOngoing => "ALERT MIN",
            StatusCategory::Clear => "CLEAR",
            StatusCategory::Ok => "OK",
            StatusCategory::Error => "ERROR",
        }
    }
}

/// `[timestamp] [CATEGORY] host key: details`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub timestamp: String,
    pub category: StatusCategory,
    pub host: String,
    pub key: String,
    pub details: String,
}

impl StatusLine {
    pub fn new(
        timestamp: &str,
        category: StatusCategory,
        metric: &Metric,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.to_string(),
            category,
            host: metric.host.clone(),
            key: metric.key.clone(),
            details: details.into(),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {} {}: {}",
            self.timestamp,
            self.category.label(),
            self.host,
            self.key,
            self.details
        )
    }
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Whether status lines are printed in the cycle started at `now`
pub fn is_status_tick(now: &DateTime<Local>, every_minutes: u32) -> bool {
    now.minute() % every_minutes.max(1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertMode;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 1, 15, hour, minute, 7).unwrap()
    }

    #[test]
    fn test_status_line_format() {
        let metric = Metric::new("db01", "system.cpu.load", 90.0, 80.0, AlertMode::Max);
        let ts = format_timestamp(&at(9, 5));
        assert_eq!(ts, "2026-01-15 09:05:07");

        let line = StatusLine::new(&ts, StatusCategory::AlertMax, &metric, "v=95 >= 90");
        assert_eq!(
            line.to_string(),
            "[2026-01-15 09:05:07] [ALERT MAX] db01 system.cpu.load: v=95 >= 90"
        );

        let line = StatusLine::new(&ts, StatusCategory::NoData, &metric, "no data");
        assert_eq!(
            line.to_string(),
            "[2026-01-15 09:05:07] [NO DATA] db01 system.cpu.load: no data"
        );
    }

    #[test]
    fn test_ongoing_shares_label() {
        assert_eq!(StatusCategory::AlertMaxOngoing.label(), "ALERT MAX");
        assert_eq!(StatusCategory::AlertMinOngoing.label(), "ALERT MIN");
    }

    #[test]
    fn test_status_tick() {
        assert!(is_status_tick(&at(10, 0), 5));
        assert!(is_status_tick(&at(10, 15), 5));
        assert!(!is_status_tick(&at(10, 13), 5));
        assert!(is_status_tick(&at(10, 13), 1));
        // zero is treated as every minute
        assert!(is_status_tick(&at(10, 13), 0));
    }
}
