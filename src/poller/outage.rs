use chrono::{DateTime, Local};

use super::status::format_timestamp;
use crate::alerts::AlertStore;
use crate::notify::{deliver, NotificationSink};

/// Raise the global outage alert when no metric produced data this cycle.
///
/// Fires once; stays quiet on later failing cycles until a successful check
/// clears the alert. Returns whether the alert was raised now.
pub(crate) async fn detect_outage(
    successes: usize,
    store: &AlertStore,
    sink: &dyn NotificationSink,
    backend_name: &str,
    now: DateTime<Local>,
) -> bool {
    if successes > 0 || store.is_global_down() {
        return false;
    }

    store.set_global_down();

    let name = backend_name.to_uppercase();
    println!("[{}] [ALERT] {} DOWN", format_timestamp(&now), name);
    tracing::error!(backend = %backend_name, "No metric returned data this cycle");
    deliver(sink, &format!("{} DOWN: no data", name)).await;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn test_fires_once_until_cleared() {
        let store = AlertStore::new();
        let sink = RecordingSink::new();

        assert!(detect_outage(0, &store, &sink, "Zabbix", Local::now()).await);
        assert!(store.is_global_down());
        assert!(!detect_outage(0, &store, &sink, "Zabbix", Local::now()).await);
        assert_eq!(sink.messages(), vec!["ZABBIX DOWN: no data".to_string()]);

        store.clear_global_down();
        assert!(detect_outage(0, &store, &sink, "Zabbix", Local::now()).await);
        assert_eq!(sink.count("ZABBIX DOWN"), 2);
    }

    #[tokio::test]
    async fn test_any_success_suppresses() {
        let store = AlertStore::new();
        let sink = RecordingSink::new();

        assert!(!detect_outage(1, &store, &sink, "Zabbix", Local::now()).await);
        assert!(!store.is_global_down());
        assert_eq!(sink.attempts(), 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_still_records() {
        let store = AlertStore::new();
        let sink = RecordingSink::new();
        sink.set_failing(true);

        assert!(detect_outage(0, &store, &sink, "Zabbix", Local::now()).await);
        assert!(store.is_global_down());
    }
}
