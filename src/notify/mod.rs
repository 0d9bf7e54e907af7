//! Notification delivery

pub mod log;
pub mod telegram;

use async_trait::async_trait;

pub use self::log::LogNotifier;
pub use telegram::TelegramNotifier;

/// Destination for alert messages
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), DeliveryError>;
}

/// Notification delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Send `text` and log the outcome. Failures are never retried.
///
/// Returns whether the message was delivered.
pub async fn deliver(sink: &dyn NotificationSink, text: &str) -> bool {
    match sink.send(text).await {
        Ok(()) => {
            tracing::debug!(message = %text, "Notification sent");
            true
        }
        Err(e) => {
            tracing::error!(message = %text, error = %e, "Failed to send notification");
            false
        }
    }
}
