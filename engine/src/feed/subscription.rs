//! Subscription handles for metric feeds

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thermowatch_shared::Reading;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ReadingCallback;
use crate::error::FeedError;
use crate::metrics;

/// Cancellation as seen by a forwarding task.
///
/// Callbacks run through [`DeliveryGate::deliver`] hold the gate for their
/// whole duration, which is what lets [`Subscription::unsubscribe`] wait out
/// a callback already in progress.
#[derive(Debug, Clone)]
pub struct DeliveryGate {
    token: CancellationToken,
    held: Arc<Mutex<()>>,
}

impl DeliveryGate {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            held: Arc::new(Mutex::new(())),
        }
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Hand `reading` to `on_reading` unless unsubscribed. Returns `false`
    /// once the subscription is cancelled.
    pub fn deliver(&self, on_reading: &ReadingCallback, reading: Reading) -> bool {
        let _held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled() {
            return false;
        }
        on_reading(reading);
        true
    }

    fn cancel_and_wait(&self) {
        self.token.cancel();
        drop(self.held.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// A live feed subscription.
///
/// Owns the forwarding task. `unsubscribe` may be called any number of
/// times; dropping the handle unsubscribes as well, but without waiting for
/// a callback that is already running.
#[derive(Debug)]
pub struct Subscription {
    gate: DeliveryGate,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn a forwarding task that stops once its gate is cancelled.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(DeliveryGate) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let gate = DeliveryGate::new();
        let task = tokio::spawn(f(gate.clone()));
        Self {
            gate,
            task: Some(task),
        }
    }

    /// Stop deliveries. No callback runs after this returns.
    ///
    /// Blocks while a callback is in progress, so it must not be called from
    /// inside this subscription's own callback.
    pub fn unsubscribe(&self) {
        self.gate.cancel_and_wait();
    }

    pub fn is_active(&self) -> bool {
        !self.gate.is_cancelled()
    }

    /// Unsubscribe and wait for the forwarding task to wind down.
    pub async fn close(mut self) {
        self.gate.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.gate.token.cancel();
    }
}

/// Drive a pull-style source: call `fetch` every `interval` and hand each
/// reading to `on_reading`.
///
/// Failed fetches are logged and counted; polling carries on. A fetch that
/// is in flight when the subscription is cancelled completes, but its
/// reading is dropped.
pub fn poll_every<F, Fut>(
    name: String,
    interval: Duration,
    fetch: F,
    on_reading: ReadingCallback,
) -> Subscription
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Reading, FeedError>> + Send,
{
    Subscription::spawn(move |gate| async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = gate.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let pending = fetch();
            let result = pending.await;
            if gate.is_cancelled() {
                break;
            }

            match result {
                Ok(reading) => {
                    if !gate.deliver(&on_reading, reading) {
                        break;
                    }
                }
                Err(e) => {
                    metrics::FEED_ERRORS.inc();
                    warn!("{}: {}", name, e);
                }
            }
        }

        debug!("{} subscription ended", name);
    })
}
