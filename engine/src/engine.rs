//! Monitoring engine.
//!
//! Wires a [`MetricFeed`] subscription into the pipeline
//! history ring → evaluator → deduplicator → notifier, owns the threshold
//! input state machine, and publishes an [`EngineSnapshot`] after every
//! change for presentation layers.
//!
//! All mutable state sits behind one mutex. Feed deliveries and user edits
//! both go through it, so a reading is evaluated against whichever range was
//! committed when it arrived; a commit still waiting on the store does not
//! hold the lock and never delays readings.

use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thermowatch_shared::utils::is_numeral_draft;
use thermowatch_shared::{
    Alert, Reading, ThresholdField, ThresholdInputs, Thresholds, DEFAULT_ALERT_TITLE,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::audit;
use crate::dedup::{AlertDecision, AlertDeduplicator, DedupState};
use crate::error::{EngineError, FeedError, InputError};
use crate::evaluator::evaluate;
use crate::feed::{MetricFeed, Subscription};
use crate::history::{HistoryRing, DEFAULT_HISTORY_CAPACITY};
use crate::metrics;
use crate::notify::Notifier;
use crate::store::{self, ThresholdStore};

/// Fired alerts kept for `recent_alerts`.
const MAX_RECENT_ALERTS: usize = 50;

/// Shown when a commit would invert the range.
pub const RANGE_ERROR_MESSAGE: &str = "Minimum must be less than maximum";

/// Shown when the store refuses a commit.
pub const PERSIST_ERROR_MESSAGE: &str = "Failed to save thresholds";

/// Engine lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Initializing,
    Running,
    Stopped,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Read-only view of the engine for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub lifecycle: Lifecycle,
    pub current_reading: Option<Reading>,
    /// Oldest first.
    pub history: Vec<Reading>,
    pub within_thresholds: bool,
    pub thresholds: Thresholds,
    pub inputs: ThresholdInputs,
    pub input_error: Option<String>,
    pub dedup: DedupState,
    /// Newest first.
    pub recent_alerts: Vec<Alert>,
    /// Readings accepted since construction. Not cleared by `reset`.
    pub readings_received: u64,
    /// Alerts fired since construction. Not cleared by `reset`.
    pub alerts_fired: u64,
}

/// Tunables fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub history_capacity: usize,
    pub alert_title: String,
    /// Range used when the store has nothing (or cannot be read).
    pub default_thresholds: Thresholds,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            alert_title: DEFAULT_ALERT_TITLE.to_string(),
            default_thresholds: Thresholds::default(),
        }
    }
}

struct EngineState {
    lifecycle: Lifecycle,
    history: HistoryRing,
    current: Option<Reading>,
    within: bool,
    thresholds: Thresholds,
    inputs: ThresholdInputs,
    input_error: Option<String>,
    dedup: AlertDeduplicator,
    alerts: VecDeque<Alert>,
    readings_received: u64,
    alerts_fired: u64,
    alert_tx: Option<mpsc::UnboundedSender<Alert>>,
}

impl EngineState {
    fn new(options: &EngineOptions) -> Self {
        Self {
            lifecycle: Lifecycle::Initializing,
            history: HistoryRing::new(options.history_capacity),
            current: None,
            within: true,
            thresholds: options.default_thresholds,
            inputs: ThresholdInputs::from(&options.default_thresholds),
            input_error: None,
            dedup: AlertDeduplicator::new(),
            alerts: VecDeque::new(),
            readings_received: 0,
            alerts_fired: 0,
            alert_tx: None,
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            lifecycle: self.lifecycle,
            current_reading: self.current.clone(),
            history: self.history.snapshot(),
            within_thresholds: self.within,
            thresholds: self.thresholds,
            inputs: self.inputs.clone(),
            input_error: self.input_error.clone(),
            dedup: self.dedup.state(),
            recent_alerts: self.alerts.iter().rev().cloned().collect(),
            readings_received: self.readings_received,
            alerts_fired: self.alerts_fired,
        }
    }

    fn revert_inputs(&mut self) {
        self.inputs = ThresholdInputs::from(&self.thresholds);
    }

    fn record_alert(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
        while self.alerts.len() > MAX_RECENT_ALERTS {
            self.alerts.pop_front();
        }
    }
}

/// State reachable from the feed callback.
struct Shared {
    state: Mutex<EngineState>,
    updates: watch::Sender<EngineSnapshot>,
    alert_title: String,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish while still holding the lock so observers never see updates
    /// out of order.
    fn publish(&self, state: &EngineState) {
        self.updates.send_replace(state.snapshot());
    }

    fn ingest(&self, reading: Reading) -> Option<Alert> {
        let mut state = self.lock();
        if state.lifecycle != Lifecycle::Running {
            metrics::READINGS_IGNORED.inc();
            debug!(
                "Ignoring reading {} while {}",
                reading.value(),
                state.lifecycle.as_str()
            );
            return None;
        }

        let value = reading.value();
        let evicted = state.history.append(reading.clone());
        state.current = Some(reading.clone());
        state.readings_received += 1;

        let evaluation = evaluate(value, &state.thresholds);
        state.within = evaluation.in_range;

        metrics::READINGS_TOTAL.inc();
        metrics::CURRENT_TEMPERATURE.set(value);
        metrics::IN_RANGE.set(if evaluation.in_range { 1.0 } else { 0.0 });
        metrics::HISTORY_LEN.set(state.history.len() as f64);
        metrics::HISTORY_EVICTIONS.inc_by(evicted as f64);

        let decision = state.dedup.observe(value, &evaluation);
        let alert = match (decision, evaluation.violation) {
            (AlertDecision::Fire, Some(violation)) => {
                let alert = Alert {
                    title: self.alert_title.clone(),
                    body: violation.message(),
                    kind: violation.kind,
                    reading,
                    thresholds: state.thresholds,
                    fired_at: Utc::now(),
                };
                metrics::ALERTS_TOTAL.with_label_values(&["fired"]).inc();
                info!("Alert: {}", alert.body);

                if let Some(tx) = &state.alert_tx {
                    if tx.send(alert.clone()).is_err() {
                        warn!("Alert delivery worker is gone, alert not sent");
                    }
                }
                state.alerts_fired += 1;
                state.record_alert(alert.clone());
                Some(alert)
            }
            (AlertDecision::Suppress, _) => {
                metrics::ALERTS_TOTAL.with_label_values(&["suppressed"]).inc();
                debug!("Suppressing repeat alert for {}", value);
                None
            }
            _ => {
                debug!("Reading {} within {}", value, state.thresholds);
                None
            }
        };

        self.publish(&state);
        alert
    }
}

/// Background pieces that exist only while running.
struct RunHandles {
    subscription: Subscription,
    delivery: JoinHandle<()>,
}

/// Deliver queued alerts one by one until the queue closes.
async fn deliver_alerts(mut rx: mpsc::UnboundedReceiver<Alert>, notifier: Arc<dyn Notifier>) {
    while let Some(alert) = rx.recv().await {
        if let Err(e) = notifier.deliver(&alert.title, &alert.body).await {
            metrics::ALERT_DELIVERY_FAILURES.inc();
            warn!("{} (via {})", e, notifier.describe());
        }
    }
    debug!("Alert delivery worker finished");
}

pub struct MonitoringEngine {
    shared: Arc<Shared>,
    feed: Arc<dyn MetricFeed>,
    store: Arc<dyn ThresholdStore>,
    notifier: Arc<dyn Notifier>,
    default_thresholds: Thresholds,
    handles: Mutex<Option<RunHandles>>,
    lifecycle_lock: tokio::sync::Mutex<()>,
    commit_lock: tokio::sync::Mutex<()>,
}

impl MonitoringEngine {
    pub fn new(
        feed: Arc<dyn MetricFeed>,
        store: Arc<dyn ThresholdStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_options(feed, store, notifier, EngineOptions::default())
    }

    pub fn with_options(
        feed: Arc<dyn MetricFeed>,
        store: Arc<dyn ThresholdStore>,
        notifier: Arc<dyn Notifier>,
        options: EngineOptions,
    ) -> Self {
        let state = EngineState::new(&options);
        let (updates, _) = watch::channel(state.snapshot());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
                alert_title: options.alert_title,
            }),
            feed,
            store,
            notifier,
            default_thresholds: options.default_thresholds,
            handles: Mutex::new(None),
            lifecycle_lock: tokio::sync::Mutex::new(()),
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load thresholds, subscribe to the feed and start delivering alerts.
    pub async fn start(&self) -> Result<(), EngineError> {
        let _guard = self.lifecycle_lock.lock().await;
        match self.shared.lock().lifecycle {
            Lifecycle::Initializing => {}
            Lifecycle::Running => return Err(EngineError::AlreadyStarted),
            Lifecycle::Stopped => return Err(EngineError::Stopped),
        }

        let thresholds =
            store::load_or_default(self.store.as_ref(), self.default_thresholds).await;

        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let delivery = tokio::spawn(deliver_alerts(alert_rx, self.notifier.clone()));

        {
            let mut state = self.shared.lock();
            state.thresholds = thresholds;
            state.revert_inputs();
            state.alert_tx = Some(alert_tx);
            state.lifecycle = Lifecycle::Running;
            self.shared.publish(&state);
        }

        let shared = self.shared.clone();
        let subscription = self.feed.subscribe(Arc::new(move |reading: Reading| {
            shared.ingest(reading);
        }));

        *self.handles_lock() = Some(RunHandles {
            subscription,
            delivery,
        });

        audit::lifecycle(Lifecycle::Running.as_str(), &self.feed.describe());
        info!(
            "Monitoring {} with thresholds {}, alerts via {}",
            self.feed.describe(),
            thresholds,
            self.notifier.describe()
        );
        Ok(())
    }

    /// Unsubscribe from the feed and stop. Idempotent; the engine cannot be
    /// restarted. Alerts already queued are still delivered.
    pub async fn stop(&self) {
        let _guard = self.lifecycle_lock.lock().await;
        let alert_tx = {
            let mut state = self.shared.lock();
            if state.lifecycle == Lifecycle::Stopped {
                return;
            }
            state.lifecycle = Lifecycle::Stopped;
            self.shared.publish(&state);
            state.alert_tx.take()
        };
        drop(alert_tx);

        let handles = self.handles_lock().take();
        if let Some(handles) = handles {
            handles.subscription.close().await;
            if let Err(e) = handles.delivery.await {
                warn!("Alert delivery worker ended abnormally: {}", e);
            }
        }

        audit::lifecycle(Lifecycle::Stopped.as_str(), &self.feed.describe());
    }

    /// Handle one reading: record it, evaluate it and alert if needed.
    ///
    /// This is what the feed subscription calls; push transports may call
    /// it directly. Ignored unless the engine is running.
    pub fn ingest(&self, reading: Reading) -> Option<Alert> {
        self.shared.ingest(reading)
    }

    /// Fetch one reading from the feed and ingest it.
    ///
    /// If the engine stops while the fetch is in flight, the reading is
    /// discarded.
    pub async fn refresh(&self) -> Result<Option<Alert>, FeedError> {
        match self.feed.fetch_once().await {
            Ok(reading) => Ok(self.ingest(reading)),
            Err(e) => {
                metrics::FEED_ERRORS.inc();
                warn!("{}: {}", self.feed.describe(), e);
                Err(e)
            }
        }
    }

    /// Clear history, current reading, alerts and dedup memory. Thresholds
    /// are kept.
    pub fn reset(&self) {
        let mut state = self.shared.lock();
        state.history.clear();
        state.current = None;
        state.within = true;
        state.dedup.reset();
        state.alerts.clear();
        metrics::HISTORY_LEN.set(0.0);
        self.shared.publish(&state);
    }

    /// Store raw text typed into a threshold field without validating it.
    ///
    /// Only empty strings and (partial) signed decimal numerals are taken;
    /// anything else leaves the field unchanged. Returns whether the text
    /// was taken.
    pub fn update_threshold_input(&self, field: ThresholdField, raw: &str) -> bool {
        if !is_numeral_draft(raw) {
            return false;
        }
        let mut state = self.shared.lock();
        state.inputs.set(field, raw.to_string());
        self.shared.publish(&state);
        true
    }

    /// Validate one edited bound, persist the new range and adopt it.
    ///
    /// On any rejection the displayed inputs revert to the committed range.
    /// A successful commit re-arms alerting for every value.
    pub async fn commit_threshold(
        &self,
        field: ThresholdField,
        raw: &str,
    ) -> Result<Thresholds, InputError> {
        let _commit = self.commit_lock.lock().await;

        let (previous, candidate) = {
            let mut state = self.shared.lock();
            if state.lifecycle == Lifecycle::Stopped {
                return Err(InputError::Stopped);
            }

            let Some(value) = parse_threshold(raw) else {
                state.revert_inputs();
                self.shared.publish(&state);
                drop(state);
                metrics::THRESHOLD_COMMITS
                    .with_label_values(&["invalid_number"])
                    .inc();
                audit::threshold_rejected(field, raw, "invalid number");
                return Err(InputError::InvalidNumber {
                    field,
                    raw: raw.to_string(),
                });
            };

            match state.thresholds.with(field, value) {
                Ok(candidate) => {
                    state.input_error = None;
                    self.shared.publish(&state);
                    (state.thresholds, candidate)
                }
                Err(_) => {
                    let (min, max) = match field {
                        ThresholdField::Min => (value, state.thresholds.max()),
                        ThresholdField::Max => (state.thresholds.min(), value),
                    };
                    state.input_error = Some(RANGE_ERROR_MESSAGE.to_string());
                    state.revert_inputs();
                    self.shared.publish(&state);
                    drop(state);
                    metrics::THRESHOLD_COMMITS
                        .with_label_values(&["invalid_range"])
                        .inc();
                    audit::threshold_rejected(field, raw, RANGE_ERROR_MESSAGE);
                    return Err(InputError::InvalidRange { min, max });
                }
            }
        };

        // Lock released: readings keep flowing against `previous` meanwhile
        let saved = self.store.save(&candidate).await;

        let mut state = self.shared.lock();
        if state.lifecycle == Lifecycle::Stopped {
            return Err(InputError::Stopped);
        }

        match saved {
            Ok(()) => {
                state.thresholds = candidate;
                state.revert_inputs();
                state.input_error = None;
                state.dedup.reset();
                if let Some(current) = &state.current {
                    state.within = candidate.contains(current.value());
                }
                self.shared.publish(&state);
                drop(state);

                metrics::THRESHOLD_COMMITS.with_label_values(&["ok"]).inc();
                audit::thresholds_committed(field, &previous, &candidate);
                Ok(candidate)
            }
            Err(e) => {
                state.revert_inputs();
                state.input_error = Some(PERSIST_ERROR_MESSAGE.to_string());
                self.shared.publish(&state);
                drop(state);

                metrics::THRESHOLD_COMMITS
                    .with_label_values(&["persist_error"])
                    .inc();
                warn!("{} ({})", e, self.store.describe());
                Err(InputError::Persist(e))
            }
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lock().lifecycle
    }

    pub fn current_reading(&self) -> Option<Reading> {
        self.shared.lock().current.clone()
    }

    /// Recent readings, oldest first.
    pub fn history(&self) -> Vec<Reading> {
        self.shared.lock().history.snapshot()
    }

    pub fn is_within_thresholds(&self) -> bool {
        self.shared.lock().within
    }

    pub fn threshold_inputs(&self) -> ThresholdInputs {
        self.shared.lock().inputs.clone()
    }

    pub fn committed_thresholds(&self) -> Thresholds {
        self.shared.lock().thresholds
    }

    pub fn input_error_message(&self) -> Option<String> {
        self.shared.lock().input_error.clone()
    }

    pub fn dedup_state(&self) -> DedupState {
        self.shared.lock().dedup.state()
    }

    /// Up to `limit` fired alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        self.shared
            .lock()
            .alerts
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receiver that sees a fresh snapshot after every change.
    pub fn watch(&self) -> watch::Receiver<EngineSnapshot> {
        self.shared.updates.subscribe()
    }

    fn handles_lock(&self) -> MutexGuard<'_, Option<RunHandles>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parse committed text: a complete signed decimal numeral with a finite value.
fn parse_threshold(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !is_numeral_draft(trimmed) {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}
