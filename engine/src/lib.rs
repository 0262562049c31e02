//! Thermowatch monitoring engine library
//!
//! Readings flow from a [`feed::MetricFeed`] through the history ring, the
//! threshold evaluator and the alert deduplicator before reaching a
//! [`notify::Notifier`]. [`MonitoringEngine`] owns the pipeline.

pub mod audit;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod feed;
pub mod history;
pub mod metrics;
pub mod notify;
pub mod retry;
pub mod server;
pub mod store;

pub use engine::{EngineOptions, EngineSnapshot, Lifecycle, MonitoringEngine};
pub use error::{EngineError, FeedError, InputError, NotifyError, StoreError};

use anyhow::Context;
use std::sync::Arc;

use crate::config::{FeedKind, MonitorConfig, NotifierKind};
use crate::feed::{HttpFeed, MetricFeed, SimulatedFeed};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::store::{FileStore, ThresholdStore};

/// Build the reading source selected by `config`.
pub fn build_feed(config: &MonitorConfig) -> anyhow::Result<Arc<dyn MetricFeed>> {
    match config.feed {
        FeedKind::Simulated => Ok(Arc::new(SimulatedFeed::new(
            config.simulated_min,
            config.simulated_max,
            config.poll_interval(),
        ))),
        FeedKind::Http => {
            let endpoint = config
                .feed_endpoint
                .as_deref()
                .context("feed_endpoint is required for the http feed")?;
            let feed = HttpFeed::new(endpoint, config.poll_interval(), config.request_timeout())?;
            Ok(Arc::new(feed))
        }
    }
}

/// Build the alert channel selected by `config`.
pub fn build_notifier(config: &MonitorConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match config.notifier {
        NotifierKind::Log => Ok(Arc::new(LogNotifier)),
        NotifierKind::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .context("webhook_url is required for the webhook notifier")?;
            Ok(Arc::new(WebhookNotifier::new(url, config.request_timeout())?))
        }
    }
}

pub fn build_store(config: &MonitorConfig) -> Arc<dyn ThresholdStore> {
    Arc::new(FileStore::new(config.store_path.clone()))
}

/// Assemble an engine (not yet started) from configuration.
pub fn build_engine(config: &MonitorConfig) -> anyhow::Result<MonitoringEngine> {
    let options = EngineOptions {
        history_capacity: config.history_capacity,
        alert_title: config.alert_title.clone(),
        default_thresholds: config.default_thresholds()?,
    };
    Ok(MonitoringEngine::with_options(
        build_feed(config)?,
        build_store(config),
        build_notifier(config)?,
        options,
    ))
}
