use std::path::PathBuf;
use std::time::Duration;

use crate::poller::PollerConfig;

/// Zabbix API connection settings
#[derive(Debug, Clone)]
pub struct ZabbixSettings {
    /// JSON-RPC endpoint, e.g. `https://zabbix.example.com/api_jsonrpc.php`
    pub url: String,
    pub api_token: String,
}

/// Telegram Bot API settings
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct AlerterConfig {
    pub metrics_file: PathBuf,
    pub zabbix: ZabbixSettings,
    /// Notifications go to the log when unset
    pub telegram: Option<TelegramSettings>,
    pub poll_interval: Duration,
    pub status_every_minutes: u32,
    pub pool_size: usize,
    pub resolve_concurrency: usize,
    pub resolve_timeout: Duration,
    pub outage_delay: Duration,
    pub stale_after: Option<Duration>,
}

impl AlerterConfig {
    /// Settings for the polling engine
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: self.poll_interval,
            status_every_minutes: self.status_every_minutes,
            pool_size: self.pool_size,
            outage_delay: self.outage_delay,
            stale_after: self.stale_after,
        }
    }
}

impl Default for AlerterConfig {
    fn default() -> Self {
        Self {
            metrics_file: PathBuf::from("metricsettings.toml"),
            zabbix: ZabbixSettings {
                url: "http://127.0.0.1/api_jsonrpc.php".to_string(),
                api_token: String::new(),
            },
            telegram: None,
            poll_interval: Duration::from_secs(60),
            status_every_minutes: 1,
            pool_size: 5,
            resolve_concurrency: 10,
            resolve_timeout: Duration::from_secs(30),
            outage_delay: Duration::from_secs(5),
            stale_after: None,
        }
    }
}
