use async_trait::async_trait;

use super::{DeliveryError, NotificationSink};

/// Writes notifications to the log, used when no messaging endpoint is configured
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        tracing::warn!("Notification: {}", text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notification() {
        // Log notification should always succeed
        tokio_test::assert_ok!(LogNotifier::new().send("test message").await);
    }
}
