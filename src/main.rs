//! zabbix-alerter service
//!
//! Run with: cargo run -- [STATUS_INTERVAL_MINUTES]
//!
//! Environment variables:
//! - ZABBIX_URL: Zabbix JSON-RPC endpoint (required)
//! - ZABBIX_API_TOKEN: Zabbix API token (required)
//! - TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID: Telegram target (optional, log only when unset)
//! - ALERTER_METRICS_FILE: metric definitions (default: metricsettings.toml)
//! - ALERTER_POLL_SECS: seconds between cycles (default: 60)
//! - ALERTER_POOL_SIZE: concurrent checks (default: 5)
//! - ALERTER_RESOLVE_CONCURRENCY: concurrent item lookups at startup (default: 10)
//! - ALERTER_STALE_AFTER_SECS: treat older samples as missing (default: unset)
//! - RUST_LOG: Log level (default: info)

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zabbix_alerter::alerts::AlertStore;
use zabbix_alerter::backend::{resolve_item_ids, MetricBackend};
use zabbix_alerter::config::{load_metrics, Cli};
use zabbix_alerter::notify::{deliver, LogNotifier, NotificationSink, TelegramNotifier};
use zabbix_alerter::poller::MetricPoller;
use zabbix_alerter::zabbix::ZabbixClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zabbix_alerter=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Cli::parse().into_config()?;

    tracing::info!("zabbix-alerter configuration:");
    tracing::info!("  Zabbix: {}", config.zabbix.url);
    tracing::info!("  Metrics file: {}", config.metrics_file.display());
    tracing::info!("  Poll interval: {} seconds", config.poll_interval.as_secs());
    tracing::info!("  Status every: {} min", config.status_every_minutes);
    tracing::info!("  Pool size: {}", config.pool_size);
    match config.stale_after {
        Some(limit) => tracing::info!("  Stale after: {} seconds", limit.as_secs()),
        None => tracing::info!("  Stale after: disabled"),
    }

    let banner = format!(
        "zabbix-alerter {} started  CFG:{}",
        env!("CARGO_PKG_VERSION"),
        file_utc_stamp(&config.metrics_file)
    );

    let mut metrics = load_metrics(&config.metrics_file)?;
    tracing::info!(count = metrics.len(), "Loaded metric definitions");

    let zabbix = Arc::new(ZabbixClient::new(&config.zabbix)?);
    let summary = resolve_item_ids(
        zabbix.as_ref(),
        &mut metrics,
        config.resolve_concurrency,
        config.resolve_timeout,
    )
    .await;
    tracing::info!(
        resolved = summary.resolved,
        unresolved = summary.unresolved(metrics.len()),
        "Item resolution complete"
    );

    let sink: Arc<dyn NotificationSink> = match &config.telegram {
        Some(settings) => {
            tracing::info!("  Notifications: Telegram chat {}", settings.chat_id);
            Arc::new(TelegramNotifier::new(settings)?)
        }
        None => {
            tracing::warn!("Telegram not configured, notifications go to the log");
            Arc::new(LogNotifier::new())
        }
    };

    deliver(sink.as_ref(), &banner).await;
    println!("{}", banner);

    let backend: Arc<dyn MetricBackend> = zabbix;
    let mut poller = MetricPoller::new(
        metrics,
        backend,
        sink,
        Arc::new(AlertStore::new()),
        config.poller_config(),
    );
    poller.start();

    shutdown_signal().await?;
    poller.stop().await;

    Ok(())
}

/// Wait for Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                tracing::info!("Received SIGINT (Ctrl-C), shutting down");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received Ctrl-C, shutting down");
    }

    Ok(())
}

/// Modification time of a file as `YYYY-MM-DDTHH:MMZ`, or `unknown`
fn file_utc_stamp(path: &Path) -> String {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(|modified| {
            DateTime::<Utc>::from(modified)
                .format("%Y-%m-%dT%H:%MZ")
                .to_string()
        })
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sigterm_triggers_shutdown() {
        let waiter = tokio::spawn(shutdown_signal());
        // let the handler register before signalling
        tokio::time::sleep(Duration::from_millis(200)).await;

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let outcome = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("shutdown signal not observed");
        assert!(outcome.unwrap().is_ok());
    }
}
