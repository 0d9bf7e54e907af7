//! Metric definitions and the metrics file

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// How a metric's thresholds are interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertMode {
    /// Unhealthy above the range: alert at `>= high`, clear at `<= low`
    #[default]
    Max,
    /// Unhealthy below the range: alert at `<= low`, clear at `>= high`
    Min,
}

impl AlertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMode::Max => "MAX",
            AlertMode::Min => "MIN",
        }
    }
}

/// A single monitored item with dual thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub host: String,
    pub key: String,
    pub threshold_high: f64,
    pub threshold_low: f64,
    #[serde(default, alias = "alert_mode")]
    pub alert_type: AlertMode,
    /// Backend item id, filled in by resolution at startup
    #[serde(skip)]
    pub item_id: Option<u64>,
}

impl Metric {
    pub fn new(
        host: impl Into<String>,
        key: impl Into<String>,
        threshold_high: f64,
        threshold_low: f64,
        alert_type: AlertMode,
    ) -> Self {
        Self {
            host: host.into(),
            key: key.into(),
            threshold_high,
            threshold_low,
            alert_type,
            item_id: None,
        }
    }

    /// Set a pre-resolved item id
    pub fn with_item_id(mut self, id: u64) -> Self {
        self.item_id = Some(id);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "host",
                key: self.key.clone(),
            });
        }
        if self.key.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "key",
                key: self.host.clone(),
            });
        }
        if !self.threshold_high.is_finite()
            || !self.threshold_low.is_finite()
            || self.threshold_low > self.threshold_high
        {
            return Err(ConfigError::InvalidThresholds {
                host: self.host.clone(),
                key: self.key.clone(),
                low: self.threshold_low,
                high: self.threshold_high,
            });
        }
        Ok(())
    }
}

/// Root of the metrics file: a `[[metric]]` array of tables
#[derive(Debug, Default, Deserialize)]
struct MetricsFile {
    #[serde(default, rename = "metric")]
    metrics: Vec<Metric>,
}

/// Parse and validate metric definitions from TOML text
pub fn parse_metrics(text: &str) -> Result<Vec<Metric>, ConfigError> {
    let file: MetricsFile = toml::from_str(text)?;
    for metric in &file.metrics {
        metric.validate()?;
    }
    Ok(file.metrics)
}

/// Load metric definitions from a TOML file
pub fn load_metrics(path: &Path) -> Result<Vec<Metric>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_metrics(&text)
}
