//! Active alert state

use std::fmt;

use dashmap::DashMap;

/// Key of an alert record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertKey {
    /// A single backend item
    Item(u64),
    /// The whole backend; never collides with an item id
    Global,
}

impl From<u64> for AlertKey {
    fn from(id: u64) -> Self {
        AlertKey::Item(id)
    }
}

impl fmt::Display for AlertKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKey::Item(id) => write!(f, "item:{}", id),
            AlertKey::Global => f.write_str("global"),
        }
    }
}

/// Kind of an active alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertKind {
    /// MAX metric crossed its high threshold
    Over,
    /// MIN metric crossed its low threshold
    Under,
    /// Backend has no data for the item
    OldValue,
    /// No metric produced data for a whole cycle
    BackendDown,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Over => "OVER",
            AlertKind::Under => "UNDER",
            AlertKind::OldValue => "OLD_VALUE",
            AlertKind::BackendDown => "BACKEND_DOWN",
        }
    }
}

/// Concurrent map of active alerts, at most one kind per key.
///
/// Every method is atomic on its own. A read followed by a write is not, so
/// callers that check-then-set must tolerate an occasional duplicate.
#[derive(Debug, Default)]
pub struct AlertStore {
    alerts: DashMap<AlertKey, AlertKind>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` is the current alert for `key`
    pub fn was_alerted(&self, key: impl Into<AlertKey>, kind: AlertKind) -> bool {
        self.get_alert(key) == Some(kind)
    }

    /// Record `kind` for `key`, replacing any previous kind
    pub fn set_alert(&self, key: impl Into<AlertKey>, kind: AlertKind) {
        self.alerts.insert(key.into(), kind);
    }

    /// Remove the alert for `key` if any
    pub fn clear_alert(&self, key: impl Into<AlertKey>) {
        self.alerts.remove(&key.into());
    }

    pub fn get_alert(&self, key: impl Into<AlertKey>) -> Option<AlertKind> {
        self.alerts.get(&key.into()).map(|entry| *entry)
    }

    pub fn is_global_down(&self) -> bool {
        self.was_alerted(AlertKey::Global, AlertKind::BackendDown)
    }

    pub fn set_global_down(&self) {
        self.set_alert(AlertKey::Global, AlertKind::BackendDown);
    }

    pub fn clear_global_down(&self) {
        self.clear_alert(AlertKey::Global);
    }

    pub fn global_alert(&self) -> Option<AlertKind> {
        self.get_alert(AlertKey::Global)
    }

    /// Number of active alert records
    pub fn active_count(&self) -> usize {
        self.alerts.len()
    }

    /// Copy of all active alerts, sorted by key
    pub fn snapshot(&self) -> Vec<(AlertKey, AlertKind)> {
        let mut entries: Vec<_> = self
            .alerts
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }
}
