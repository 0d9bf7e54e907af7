//! Service configuration
//!
//! Runtime settings come from the command line or environment, metric
//! definitions from a TOML file.

pub mod args;
pub mod metric;
pub mod settings;

pub use args::Cli;
pub use metric::{load_metrics, parse_metrics, AlertMode, Metric};
pub use settings::{AlerterConfig, TelegramSettings, ZabbixSettings};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid metrics file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Metric {host} {key}: threshold_low ({low}) must not exceed threshold_high ({high})")]
    InvalidThresholds {
        host: String,
        key: String,
        low: f64,
        high: f64,
    },

    #[error("Metric {key:?} has an empty {field}")]
    EmptyField { field: &'static str, key: String },

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}
