//! HTTP temperature source.
//!
//! Talks to a small JSON API:
//!
//! - `GET {endpoint}/temperature` returns `{ "temperature": 23.4 }`
//! - `GET {endpoint}/temperature/history` returns
//!   `{ "history": [ { "temperature": 23.4, "timestamp": "..." }, ... ] }`

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thermowatch_shared::Reading;
use tracing::warn;

use super::{poll_every, MetricFeed, ReadingCallback, Subscription};
use crate::error::FeedError;

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct HistoryPayload {
    history: Vec<serde_json::Value>,
}

/// Pull-style feed polling a remote endpoint.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
    endpoint: String,
    poll_interval: Duration,
}

impl HttpFeed {
    pub fn new(
        endpoint: &str,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| FeedError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the remote history, oldest first as the server returns it.
    ///
    /// Entries that are not valid readings are skipped with a warning.
    pub async fn fetch_history(&self) -> Result<Vec<Reading>, FeedError> {
        let url = format!("{}/temperature/history", self.endpoint);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_history(&body)
    }

    async fn fetch_current(&self) -> Result<Reading, FeedError> {
        let url = format!("{}/temperature", self.endpoint);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_current(&body)
    }
}

/// Decode a `{ "temperature": n }` body, stamped with the arrival time.
pub(crate) fn parse_current(body: &str) -> Result<Reading, FeedError> {
    let payload: CurrentPayload =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;
    Reading::now(payload.temperature).map_err(|e| FeedError::Malformed(e.to_string()))
}

/// Decode a `{ "history": [...] }` body.
pub(crate) fn parse_history(body: &str) -> Result<Vec<Reading>, FeedError> {
    let payload: HistoryPayload =
        serde_json::from_str(body).map_err(|e| FeedError::Malformed(e.to_string()))?;

    let mut readings = Vec::with_capacity(payload.history.len());
    for (index, entry) in payload.history.into_iter().enumerate() {
        match serde_json::from_value::<Reading>(entry) {
            Ok(reading) => readings.push(reading),
            Err(e) => warn!("Skipping history entry {}: {}", index, e),
        }
    }
    Ok(readings)
}

#[async_trait]
impl MetricFeed for HttpFeed {
    async fn fetch_once(&self) -> Result<Reading, FeedError> {
        self.fetch_current().await
    }

    fn subscribe(&self, on_reading: ReadingCallback) -> Subscription {
        let feed = self.clone();
        poll_every(
            self.describe(),
            self.poll_interval,
            move || {
                let feed = feed.clone();
                async move { feed.fetch_current().await }
            },
            on_reading,
        )
    }

    fn describe(&self) -> String {
        format!("http feed {}", self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current() {
        let reading = parse_current(r#"{"temperature": 23.4}"#).unwrap();
        assert_eq!(reading.value(), 23.4);

        let reading = parse_current(r#"{"temperature": 25, "unit": "C"}"#).unwrap();
        assert_eq!(reading.value(), 25.0);
    }

    #[test]
    fn test_parse_current_malformed() {
        for body in ["", "{}", r#"{"temperature": null}"#, r#"{"temperature": "25"}"#, "[]"] {
            assert!(
                matches!(parse_current(body), Err(FeedError::Malformed(_))),
                "{body:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_parse_history_skips_bad_entries() {
        let body = r#"{
            "history": [
                {"temperature": 25, "timestamp": "2024-11-05T10:00:00Z"},
                {"temperature": "n/a", "timestamp": "2024-11-05T10:00:05Z"},
                {"timestamp": "2024-11-05T10:00:10Z"},
                {"temperature": 26.5, "timestamp": "2024-11-05T10:00:15.250Z"}
            ]
        }"#;
        let readings = parse_history(body).unwrap();
        let values: Vec<f64> = readings.iter().map(Reading::value).collect();
        assert_eq!(values, vec![25.0, 26.5]);
    }

    #[test]
    fn test_parse_history_requires_envelope() {
        assert!(parse_history(r#"[{"temperature": 25}]"#).is_err());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let feed = HttpFeed::new(
            "http://localhost:3000/",
            Duration::from_secs(5),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(feed.endpoint(), "http://localhost:3000");
        assert_eq!(feed.describe(), "http feed http://localhost:3000");
    }
}
