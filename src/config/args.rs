//! Command-line and environment settings

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use super::settings::{AlerterConfig, TelegramSettings, ZabbixSettings};
use super::ConfigError;

/// Default status-print interval when the positional argument is missing or invalid
const DEFAULT_STATUS_MINUTES: u32 = 1;

#[derive(Debug, Parser)]
#[command(name = "zabbix-alerter", version, about = "Zabbix threshold alerter")]
pub struct Cli {
    /// Status-print interval in minutes
    pub status_interval: Option<String>,

    /// Metric definitions file (TOML)
    #[arg(long, env = "ALERTER_METRICS_FILE", default_value = "metricsettings.toml")]
    pub metrics_file: PathBuf,

    /// Zabbix JSON-RPC endpoint
    #[arg(long, env = "ZABBIX_URL")]
    pub zabbix_url: String,

    /// Zabbix API token
    #[arg(long, env = "ZABBIX_API_TOKEN", hide_env_values = true)]
    pub zabbix_api_token: String,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// Seconds between polling cycles
    #[arg(long, env = "ALERTER_POLL_SECS", default_value_t = 60)]
    pub poll_secs: u64,

    /// Maximum number of concurrent metric checks
    #[arg(long, env = "ALERTER_POOL_SIZE", default_value_t = 5)]
    pub pool_size: usize,

    /// Maximum number of concurrent item lookups at startup
    #[arg(long, env = "ALERTER_RESOLVE_CONCURRENCY", default_value_t = 10)]
    pub resolve_concurrency: usize,

    /// Treat samples older than this many seconds as missing
    #[arg(long, env = "ALERTER_STALE_AFTER_SECS")]
    pub stale_after_secs: Option<u64>,
}

impl Cli {
    /// Validate and convert into the service configuration
    pub fn into_config(self) -> Result<AlerterConfig, ConfigError> {
        if self.poll_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "poll_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "pool_size",
                reason: "must be at least 1".to_string(),
            });
        }

        let status_every_minutes = parse_status_interval(self.status_interval.as_deref());

        let telegram = match (self.telegram_bot_token, self.telegram_chat_id) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings { bot_token, chat_id }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidSetting {
                    name: "telegram",
                    reason: "bot token and chat id must be set together".to_string(),
                })
            }
        };

        Ok(AlerterConfig {
            metrics_file: self.metrics_file,
            zabbix: ZabbixSettings {
                url: self.zabbix_url,
                api_token: self.zabbix_api_token,
            },
            telegram,
            poll_interval: Duration::from_secs(self.poll_secs),
            status_every_minutes,
            pool_size: self.pool_size,
            resolve_concurrency: self.resolve_concurrency.max(1),
            stale_after: self.stale_after_secs.map(Duration::from_secs),
            ..AlerterConfig::default()
        })
    }
}

/// Parse the positional status interval, falling back to the default on bad input
fn parse_status_interval(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_STATUS_MINUTES;
    };
    match raw.trim().parse::<u32>() {
        Ok(minutes) if minutes > 0 => minutes,
        _ => {
            tracing::warn!(
                value = %raw,
                "Invalid status interval, using {} min",
                DEFAULT_STATUS_MINUTES
            );
            DEFAULT_STATUS_MINUTES
        }
    }
}
