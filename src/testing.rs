//! In-memory backend and sink used by unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::{MetricBackend, QueryError, Sample};
use crate::notify::{DeliveryError, NotificationSink};

/// One scripted answer to `fetch_latest`
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    /// A fresh sample observed now
    Value(f64),
    /// A sample with an explicit timestamp
    Sample(Sample),
    NoData,
    Fail,
}

/// Backend whose answers are queued per item; an empty queue means no data
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    items: HashMap<(String, String), u64>,
    resolve_failures: HashSet<(String, String)>,
    slow_resolves: HashSet<(String, String)>,
    scripts: Mutex<HashMap<u64, VecDeque<Scripted>>>,
    fetches: Mutex<HashMap<u64, usize>>,
    total_fetches: AtomicUsize,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, host: &str, key: &str, id: u64) -> Self {
        self.items.insert((host.to_string(), key.to_string()), id);
        self
    }

    pub fn with_resolve_failure(mut self, host: &str, key: &str) -> Self {
        self.resolve_failures.insert((host.to_string(), key.to_string()));
        self
    }

    /// Lookups of this pair hang for an hour before answering
    pub fn with_slow_resolve(mut self, host: &str, key: &str) -> Self {
        self.slow_resolves.insert((host.to_string(), key.to_string()));
        self
    }

    /// Every fetch takes `latency` to answer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue answers for an item, consumed one per fetch
    pub fn push(&self, id: u64, answers: impl IntoIterator<Item = Scripted>) {
        self.scripts.lock().entry(id).or_default().extend(answers);
    }

    pub fn fetches(&self, id: u64) -> usize {
        self.fetches.lock().get(&id).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "Zabbix"
    }

    async fn resolve_id(&self, host: &str, key: &str) -> Result<Option<u64>, QueryError> {
        let lookup = (host.to_string(), key.to_string());
        if self.resolve_failures.contains(&lookup) {
            return Err(QueryError::Network("connection refused".to_string()));
        }
        if self.slow_resolves.contains(&lookup) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self.items.get(&lookup).copied())
    }

    async fn fetch_latest(&self, item_id: u64) -> Result<Option<Sample>, QueryError> {
        self.total_fetches.fetch_add(1, Ordering::SeqCst);
        *self.fetches.lock().entry(item_id).or_default() += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self
            .scripts
            .lock()
            .get_mut(&item_id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Scripted::NoData);

        match next {
            Scripted::Value(value) => Ok(Some(Sample::new(value, chrono::Utc::now().timestamp()))),
            Scripted::Sample(sample) => Ok(Some(sample)),
            Scripted::NoData => Ok(None),
            Scripted::Fail => Err(QueryError::Network("connection reset".to_string())),
        }
    }
}

/// Sink that records every delivered message
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of delivered messages starting with `prefix`
    pub fn count(&self, prefix: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, text: &str) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            });
        }
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

/// Serve `app` on an ephemeral local port, returning its base URL
pub async fn spawn_http(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
