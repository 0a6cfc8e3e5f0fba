//! Scheduler module for refreshing dashboard data.

mod clock;
mod state;

pub use clock::*;
pub use state::*;

use crate::source::RowSource;
use crate::telemetry::{aggregate, summarize, DeriveOptions};

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Completed { sensors: usize, rows: usize },
    Failed { message: String },
    /// Another refresh was already running.
    Skipped,
}

impl RefreshOutcome {
    fn not_running() -> Self {
        RefreshOutcome::Failed {
            message: "refresh loop is not running".to_string(),
        }
    }
}

type TriggerReply = oneshot::Sender<RefreshOutcome>;

const TRIGGER_QUEUE: usize = 16;

/// Handle for requesting a refresh from the scheduler loop.
#[derive(Clone)]
pub struct RefreshTrigger {
    tx: mpsc::Sender<TriggerReply>,
    running: Arc<AtomicBool>,
}

impl RefreshTrigger {
    /// Queue a refresh and wait for its outcome.
    ///
    /// Requests queued while a refresh is running are served together by
    /// the next refresh. Fails at once when the loop is not running.
    pub async fn request(&self) -> RefreshOutcome {
        if !self.running.load(Ordering::Acquire) {
            return RefreshOutcome::not_running();
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(reply_tx).await.is_err() {
            return RefreshOutcome::not_running();
        }
        // The loop drops queued replies when it stops
        reply_rx.await.unwrap_or_else(|_| RefreshOutcome::not_running())
    }
}

/// Periodically pulls rows from a source and rebuilds the dashboard.
///
/// Refreshes never overlap: the loop runs them one at a time, and direct
/// calls to `refresh_now` while one is running return `Skipped`.
pub struct RefreshScheduler<S: RowSource> {
    source: S,
    options: DeriveOptions,
    interval: Duration,
    clock: Arc<dyn Clock>,
    dashboard: SharedDashboard,
    in_flight: AtomicBool,
    running: Arc<AtomicBool>,
    trigger_tx: mpsc::Sender<TriggerReply>,
    trigger_rx: Mutex<Option<mpsc::Receiver<TriggerReply>>>,
    stop: Mutex<Option<broadcast::Sender<()>>>,
}

impl<S: RowSource> RefreshScheduler<S> {
    pub fn new(source: S, options: DeriveOptions, interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_QUEUE);

        Self {
            source,
            options,
            interval: if interval.is_zero() {
                Duration::from_secs(1)
            } else {
                interval
            },
            clock,
            dashboard: Arc::new(RwLock::new(DashboardState::default())),
            in_flight: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
            trigger_tx,
            trigger_rx: Mutex::new(Some(trigger_rx)),
            stop: Mutex::new(None),
        }
    }

    pub fn dashboard(&self) -> SharedDashboard {
        self.dashboard.clone()
    }

    pub fn trigger(&self) -> RefreshTrigger {
        RefreshTrigger {
            tx: self.trigger_tx.clone(),
            running: self.running.clone(),
        }
    }

    /// Start the refresh loop. The first refresh runs immediately.
    pub async fn start(self: &Arc<Self>) {
        let triggers = match self.trigger_rx.lock().await.take() {
            Some(rx) => rx,
            None => {
                tracing::warn!("Refresh scheduler already started");
                return;
            }
        };

        let (stop_tx, stop_rx) = broadcast::channel(1);
        *self.stop.lock().await = Some(stop_tx);
        self.running.store(true, Ordering::Release);

        tracing::info!("Starting refresh scheduler every {:?}", self.interval);

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run_loop(triggers, stop_rx).await;
        });
    }

    /// Stop the refresh loop after any refresh in progress.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let stop = self.stop.lock().await;
        if let Some(tx) = stop.as_ref() {
            let _ = tx.send(());
        }
    }

    async fn run_loop(
        &self,
        mut triggers: mpsc::Receiver<TriggerReply>,
        mut stop_rx: broadcast::Receiver<()>,
    ) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    tracing::info!("Refresh scheduler stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.refresh_now().await;
                }
                Some(reply) = triggers.recv() => {
                    let mut waiting = vec![reply];
                    while let Ok(more) = triggers.try_recv() {
                        waiting.push(more);
                    }

                    let outcome = self.refresh_now().await;
                    for reply in waiting {
                        let _ = reply.send(outcome.clone());
                    }
                }
            }
        }
    }

    /// Fetch rows and rebuild the dashboard.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Skipping refresh: another refresh is in progress");
            return RefreshOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.dashboard.write().await.begin_refresh();

        match self.source.fetch_rows().await {
            Ok(rows) => {
                let sensors = aggregate(&rows, &self.options);
                let gateway = summarize(&rows, &self.options.time);
                let outcome = RefreshOutcome::Completed {
                    sensors: sensors.len(),
                    rows: rows.len(),
                };

                let now = self.clock.now();
                self.dashboard
                    .write()
                    .await
                    .apply_snapshot(sensors, gateway, rows, now);

                tracing::info!("Refresh complete: {:?}", outcome);
                outcome
            }
            Err(e) => {
                tracing::error!("Refresh failed: {}", e);
                let message = e.user_message();
                self.dashboard.write().await.apply_error(message.clone());
                RefreshOutcome::Failed { message }
            }
        }
    }
}

/// Clears the in-flight flag even if the refresh future is dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
