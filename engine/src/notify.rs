//! Outbound alert notification channels.
//!
//! Delivery is best-effort: the engine logs and counts failures and never
//! retries them.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thermowatch_shared::Notification;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::NotifyError;

const ALERT_TARGET: &str = "thermowatch::alert";

/// Something that can show or send an alert to a person.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError>;

    fn describe(&self) -> String;
}

/// Writes alerts to the log on a dedicated target.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        warn!(target: ALERT_TARGET, title = %title, "{}", body);
        Ok(())
    }

    fn describe(&self) -> String {
        "log".to_string()
    }
}

/// Forwards alerts over an in-process channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn create() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        self.tx
            .send(Notification {
                title: title.to_string(),
                body: body.to_string(),
            })
            .map_err(|_| NotifyError::Delivery("notification receiver dropped".into()))
    }

    fn describe(&self) -> String {
        "channel".to_string()
    }
}

/// POSTs `{ "title": .., "body": .. }` to a webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn deliver(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let payload = Notification {
            title: title.to_string(),
            body: body.to_string(),
        };
        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook answered {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("webhook {}", self.url)
    }
}
