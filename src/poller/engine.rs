//! Cycle scheduling and fan-out

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use dashmap::DashMap;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

use super::check::CheckContext;
use super::outage::detect_outage;
use super::status::{format_timestamp, is_status_tick, StatusCategory, StatusLine};
use crate::alerts::AlertStore;
use crate::backend::MetricBackend;
use crate::config::Metric;
use crate::notify::NotificationSink;

/// Polling engine settings
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Period between cycle starts
    pub poll_interval: Duration,
    /// Status lines are printed when the minute is a multiple of this
    pub status_every_minutes: u32,
    /// Maximum concurrent metric checks
    pub pool_size: usize,
    /// Wait between dispatching a cycle and evaluating the outage detector
    pub outage_delay: Duration,
    /// Samples at least this old count as missing
    pub stale_after: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            status_every_minutes: 1,
            pool_size: 5,
            outage_delay: Duration::from_secs(5),
            stale_after: None,
        }
    }
}

/// Summary of one polling cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Metrics sent to the backend
    pub dispatched: usize,
    /// Metrics without an item id
    pub skipped: usize,
    /// Checks that returned a usable sample
    pub successes: usize,
    /// Whether this cycle raised the global outage alert
    pub outage_raised: bool,
    /// Whether this cycle printed status lines
    pub status_tick: bool,
    /// Status lines in metric order, empty outside status ticks
    pub lines: Vec<StatusLine>,
}

struct PollerInner {
    metrics: Vec<Metric>,
    ctx: CheckContext,
    pool: Arc<Semaphore>,
    config: PollerConfig,
}

/// Periodically checks every metric and drives alert notifications
pub struct MetricPoller {
    inner: Arc<PollerInner>,
    /// Shutdown signal sender
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MetricPoller {
    pub fn new(
        metrics: Vec<Metric>,
        backend: Arc<dyn MetricBackend>,
        sink: Arc<dyn NotificationSink>,
        store: Arc<AlertStore>,
        config: PollerConfig,
    ) -> Self {
        let ctx = CheckContext {
            backend,
            sink,
            store,
            last_values: DashMap::new(),
            stale_after: config.stale_after,
        };

        Self {
            inner: Arc::new(PollerInner {
                metrics,
                ctx,
                pool: Arc::new(Semaphore::new(config.pool_size.max(1))),
                config,
            }),
            shutdown_tx: None,
            handle: None,
        }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.inner.metrics
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.inner.ctx.store
    }

    /// Last value seen for an item
    pub fn last_value(&self, item_id: u64) -> Option<f64> {
        self.inner.ctx.last_values.get(&item_id).map(|v| *v)
    }

    /// Run a single cycle as if started at `now`
    pub async fn poll_once(&self, now: DateTime<Local>) -> CycleReport {
        self.inner.run_cycle(now).await
    }

    /// Start the background timer
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::warn!("Metric poller already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(tokio::spawn(run_timer(Arc::clone(&self.inner), shutdown_rx)));
    }

    /// Stop the timer, then wait for in-flight cycles to finish
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Metric poller task failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

async fn run_timer(inner: Arc<PollerInner>, mut shutdown_rx: mpsc::Receiver<()>) {
    tracing::info!(
        metrics = inner.metrics.len(),
        pool_size = inner.config.pool_size,
        "Metric poller started with interval {:?}",
        inner.config.poll_interval
    );

    let mut ticker = interval(inner.config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut cycles: JoinSet<CycleReport> = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                while let Some(done) = cycles.try_join_next() {
                    observe_cycle(done);
                }
                if !cycles.is_empty() {
                    tracing::warn!(in_flight = cycles.len(), "Previous polling cycle still running");
                }

                let inner = Arc::clone(&inner);
                cycles.spawn(async move { inner.run_cycle(Local::now()).await });
            }
            _ = shutdown_rx.recv() => {
                tracing::info!("Metric poller shutting down");
                break;
            }
        }
    }

    while let Some(done) = cycles.join_next().await {
        observe_cycle(done);
    }
    tracing::info!("Metric poller stopped");
}

fn observe_cycle(done: Result<CycleReport, JoinError>) {
    match done {
        Ok(report) => tracing::debug!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            successes = report.successes,
            outage = report.outage_raised,
            "Polling cycle finished"
        ),
        Err(e) => tracing::error!(error = %e, "Polling cycle task failed"),
    }
}

impl PollerInner {
    async fn run_cycle(self: &Arc<Self>, now: DateTime<Local>) -> CycleReport {
        let ts = format_timestamp(&now);
        let status_tick = is_status_tick(&now, self.config.status_every_minutes);
        let successes = Arc::new(AtomicUsize::new(0));

        let mut report = CycleReport {
            status_tick,
            ..CycleReport::default()
        };
        let mut lines: Vec<(usize, StatusLine)> = Vec::new();
        let mut checks: JoinSet<(usize, StatusLine)> = JoinSet::new();

        for (index, metric) in self.metrics.iter().enumerate() {
            let Some(item_id) = metric.item_id else {
                report.skipped += 1;
                if status_tick {
                    let line = StatusLine::new(&ts, StatusCategory::Skip, metric, "no itemId");
                    println!("{}", line);
                    lines.push((index, line));
                }
                continue;
            };

            report.dispatched += 1;
            let inner = Arc::clone(self);
            let successes = Arc::clone(&successes);
            let ts = ts.clone();

            checks.spawn(async move {
                let metric = &inner.metrics[index];
                let line = match Arc::clone(&inner.pool).acquire_owned().await {
                    Ok(_permit) => {
                        inner
                            .ctx
                            .check_metric(metric, item_id, now, &successes)
                            .await
                    }
                    Err(_) => StatusLine::new(&ts, StatusCategory::Error, metric, "worker pool closed"),
                };
                if status_tick {
                    println!("{}", line);
                }
                (index, line)
            });
        }

        // Checks keep running while the detector waits
        tokio::time::sleep(self.config.outage_delay).await;
        report.outage_raised = detect_outage(
            successes.load(Ordering::SeqCst),
            &self.ctx.store,
            self.ctx.sink.as_ref(),
            self.ctx.backend.name(),
            Local::now(),
        )
        .await;

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(entry) if status_tick => lines.push(entry),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Metric check task failed"),
            }
        }

        lines.sort_by_key(|(index, _)| *index);
        report.lines = lines.into_iter().map(|(_, line)| line).collect();
        report.successes = successes.load(Ordering::SeqCst);
        report
    }
}
