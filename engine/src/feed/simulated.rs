//! Simulated temperature source
//!
//! Emits uniformly random temperatures rounded to one decimal place, like a
//! sensor rig on a bench.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use thermowatch_shared::Reading;

use super::{poll_every, MetricFeed, ReadingCallback, Subscription};
use crate::error::FeedError;

#[derive(Debug, Clone)]
pub struct SimulatedFeed {
    min: f64,
    max: f64,
    interval: Duration,
}

impl SimulatedFeed {
    /// Readings fall in `[min, max]`. Bounds are swapped if given backwards.
    pub fn new(min: f64, max: f64, interval: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max, interval }
    }

    fn generate(&self) -> Result<Reading, FeedError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(FeedError::Malformed(format!(
                "simulated range [{}, {}] is not finite",
                self.min, self.max
            )));
        }

        let mut rng = rand::thread_rng();
        let raw = if self.min == self.max {
            self.min
        } else if (self.max - self.min).is_finite() {
            rng.gen_range(self.min..=self.max)
        } else {
            // Span overflows f64; interpolate instead of sampling the span
            let t: f64 = rng.gen();
            (self.min * (1.0 - t) + self.max * t).clamp(self.min, self.max)
        };

        let rounded = (raw * 10.0).round() / 10.0;
        let value = if rounded.is_finite() { rounded } else { raw };
        Reading::now(value).map_err(|e| FeedError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl MetricFeed for SimulatedFeed {
    async fn fetch_once(&self) -> Result<Reading, FeedError> {
        self.generate()
    }

    fn subscribe(&self, on_reading: ReadingCallback) -> Subscription {
        let feed = self.clone();
        poll_every(
            self.describe(),
            self.interval,
            move || {
                let reading = feed.generate();
                async move { reading }
            },
            on_reading,
        )
    }

    fn describe(&self) -> String {
        format!("simulated feed [{}, {}]", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_values_within_bounds_and_rounded() {
        let feed = SimulatedFeed::new(15.0, 35.0, Duration::from_secs(5));
        for _ in 0..200 {
            let value = feed.fetch_once().await.unwrap().value();
            assert!((15.0..=35.0).contains(&value), "{value} out of bounds");
            let scaled = value * 10.0;
            assert!((scaled - scaled.round()).abs() < 1e-9, "{value} not rounded");
        }
    }

    #[tokio::test]
    async fn test_degenerate_range() {
        let feed = SimulatedFeed::new(21.0, 21.0, Duration::from_secs(1));
        assert_eq!(feed.fetch_once().await.unwrap().value(), 21.0);
    }

    #[tokio::test]
    async fn test_extreme_range_does_not_panic() {
        let feed = SimulatedFeed::new(-1e308, 1e308, Duration::from_secs(1));
        for _ in 0..50 {
            let value = feed.fetch_once().await.unwrap().value();
            assert!((-1e308..=1e308).contains(&value), "{value} out of bounds");
        }

        let feed = SimulatedFeed::new(f64::MIN, f64::MAX, Duration::from_secs(1));
        assert!(feed.fetch_once().await.unwrap().value().is_finite());
    }

    #[tokio::test]
    async fn test_non_finite_range_is_an_error() {
        let feed = SimulatedFeed::new(f64::NAN, 20.0, Duration::from_secs(1));
        assert!(matches!(feed.fetch_once().await, Err(FeedError::Malformed(_))));

        let feed = SimulatedFeed::new(0.0, f64::INFINITY, Duration::from_secs(1));
        assert!(matches!(feed.fetch_once().await, Err(FeedError::Malformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscription_emits_on_cadence() {
        let feed = SimulatedFeed::new(35.0, 30.0, Duration::from_secs(5));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let sub = feed.subscribe(Arc::new(move |r: Reading| {
            seen_clone.lock().unwrap().push(r.value());
        }));
        tokio::time::sleep(Duration::from_secs(11)).await;
        sub.close().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|v| (30.0..=35.0).contains(v)));
    }
}
