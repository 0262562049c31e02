//! Metric feed abstraction
//!
//! A feed produces timestamped temperature readings. Pull-style sources
//! ([`HttpFeed`]) are polled on a fixed cadence; push-style sources
//! ([`ChannelFeed`], [`SimulatedFeed`]) decide their own cadence. Either
//! way the consumer sees the same `subscribe(callback) -> Subscription`
//! contract.

mod channel;
mod http;
mod simulated;
mod subscription;

pub use channel::{ChannelFeed, FeedPublisher};
pub use http::HttpFeed;
pub use simulated::SimulatedFeed;
pub use subscription::{poll_every, DeliveryGate, Subscription};

use async_trait::async_trait;
use std::sync::Arc;
use thermowatch_shared::Reading;

use crate::error::FeedError;

/// Callback invoked once per delivered reading.
pub type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync>;

/// Source of temperature readings.
#[async_trait]
pub trait MetricFeed: Send + Sync {
    /// Fetch a single reading right now.
    async fn fetch_once(&self) -> Result<Reading, FeedError>;

    /// Start delivering readings to `on_reading` until the returned
    /// subscription is cancelled or dropped.
    fn subscribe(&self, on_reading: ReadingCallback) -> Subscription;

    /// Human-readable description of the source.
    fn describe(&self) -> String;
}
