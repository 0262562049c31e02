//! Channel-based feed.
//!
//! Receives readings pushed by some other part of the process (a message
//! bus bridge, a sensor driver, a test) over a broadcast channel.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thermowatch_shared::{HistoryRecord, Reading};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::{MetricFeed, ReadingCallback, Subscription};
use crate::error::FeedError;

/// Default number of readings buffered per subscriber.
const DEFAULT_CAPACITY: usize = 64;

type Latest = Arc<Mutex<Option<Reading>>>;

/// Sending half of a [`ChannelFeed`].
#[derive(Debug, Clone)]
pub struct FeedPublisher {
    tx: broadcast::Sender<Reading>,
    latest: Latest,
}

impl FeedPublisher {
    /// Publish a reading. Returns the number of live subscribers it reached.
    pub fn publish(&self, reading: Reading) -> usize {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(reading.clone());
        self.tx.send(reading).unwrap_or(0)
    }

    /// Publish a raw value stamped with the current time.
    pub fn publish_value(&self, value: f64) -> Result<usize, FeedError> {
        let reading = Reading::now(value).map_err(|e| FeedError::Malformed(e.to_string()))?;
        Ok(self.publish(reading))
    }

    /// Publish a JSON payload `{ "temperature": .., "timestamp": .. }`.
    ///
    /// Anything that does not decode into a finite reading is rejected and
    /// never reaches subscribers.
    pub fn publish_json(&self, payload: &str) -> Result<usize, FeedError> {
        let record: HistoryRecord =
            serde_json::from_str(payload).map_err(|e| FeedError::Malformed(e.to_string()))?;
        let reading = Reading::try_from(record).map_err(|e| FeedError::Malformed(e.to_string()))?;
        Ok(self.publish(reading))
    }
}

/// Receiving half: a push-style [`MetricFeed`].
#[derive(Debug)]
pub struct ChannelFeed {
    tx: broadcast::Sender<Reading>,
    latest: Latest,
    description: String,
}

impl ChannelFeed {
    /// Create a publisher/feed pair.
    pub fn create(source_description: &str) -> (FeedPublisher, Self) {
        Self::with_capacity(source_description, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source_description: &str, capacity: usize) -> (FeedPublisher, Self) {
        let (tx, _) = broadcast::channel(capacity.max(1));
        let latest: Latest = Arc::new(Mutex::new(None));
        let publisher = FeedPublisher {
            tx: tx.clone(),
            latest: latest.clone(),
        };
        let feed = Self {
            tx,
            latest,
            description: format!("channel: {}", source_description),
        };
        (publisher, feed)
    }
}

#[async_trait]
impl MetricFeed for ChannelFeed {
    async fn fetch_once(&self) -> Result<Reading, FeedError> {
        self.latest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| FeedError::Unavailable("nothing published yet".into()))
    }

    fn subscribe(&self, on_reading: ReadingCallback) -> Subscription {
        let mut rx = self.tx.subscribe();
        let description = self.description.clone();

        Subscription::spawn(move |gate| async move {
            loop {
                let msg = tokio::select! {
                    biased;
                    _ = gate.cancelled() => break,
                    msg = rx.recv() => msg,
                };
                match msg {
                    Ok(reading) => {
                        if !gate.deliver(&on_reading, reading) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{}: subscriber lagged, skipped {} readings", description, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("{} subscription ended", description);
        })
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}
