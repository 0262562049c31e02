//! Monitor configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML file, then `THERMOWATCH_*` environment variables.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thermowatch_shared::{Thresholds, DEFAULT_ALERT_TITLE, DEFAULT_MAX, DEFAULT_MIN};

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "THERMOWATCH";

/// Where readings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Simulated,
    Http,
}

impl std::str::FromStr for FeedKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simulated" | "sim" => Ok(FeedKind::Simulated),
            "http" => Ok(FeedKind::Http),
            _ => anyhow::bail!("Invalid feed kind: {}", s),
        }
    }
}

/// Where alerts go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    Log,
    Webhook,
}

impl std::str::FromStr for NotifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(NotifierKind::Log),
            "webhook" => Ok(NotifierKind::Webhook),
            _ => anyhow::bail!("Invalid notifier kind: {}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Readings kept in the history ring
    pub history_capacity: usize,

    /// Reading source
    pub feed: FeedKind,

    /// Base URL of the HTTP feed (required when `feed = "http"`)
    pub feed_endpoint: Option<String>,

    /// Poll cadence for pull feeds, emit cadence for the simulator
    pub poll_interval_secs: u64,

    /// Timeout for each outbound HTTP request
    pub request_timeout_secs: u64,

    /// Simulator output range
    pub simulated_min: f64,
    pub simulated_max: f64,

    /// JSON file holding the user's thresholds
    pub store_path: PathBuf,

    /// Range used when nothing is stored
    pub default_min: f64,
    pub default_max: f64,

    /// Notification title for alerts
    pub alert_title: String,

    /// Alert channel
    pub notifier: NotifierKind,

    /// Target for `notifier = "webhook"`
    pub webhook_url: Option<String>,

    /// Admin HTTP listen address (health checks, metrics, status); disabled when unset
    pub admin_addr: Option<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            feed: FeedKind::Simulated,
            feed_endpoint: None,
            poll_interval_secs: 5,
            request_timeout_secs: 10,
            simulated_min: 15.0,
            simulated_max: 35.0,
            store_path: PathBuf::from("thresholds.json"),
            default_min: DEFAULT_MIN,
            default_max: DEFAULT_MAX,
            alert_title: DEFAULT_ALERT_TITLE.to_string(),
            notifier: NotifierKind::Log,
            webhook_url: None,
            admin_addr: None,
        }
    }
}

impl MonitorConfig {
    /// Load defaults, then `path` (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Range to fall back on when the store is empty or unreadable.
    pub fn default_thresholds(&self) -> anyhow::Result<Thresholds> {
        Thresholds::new(self.default_min, self.default_max).context("Invalid default thresholds")
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.history_capacity == 0 {
            anyhow::bail!("History capacity must be greater than 0");
        }

        if self.poll_interval_secs == 0 {
            anyhow::bail!("Poll interval must be greater than 0");
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        self.default_thresholds()?;

        if !self.simulated_min.is_finite()
            || !self.simulated_max.is_finite()
            || self.simulated_min > self.simulated_max
            || !(self.simulated_max - self.simulated_min).is_finite()
        {
            anyhow::bail!(
                "Simulated range [{}, {}] is invalid",
                self.simulated_min,
                self.simulated_max
            );
        }

        if self.feed == FeedKind::Http && self.feed_endpoint.is_none() {
            anyhow::bail!("feed_endpoint is required for the http feed");
        }

        if self.notifier == NotifierKind::Webhook && self.webhook_url.is_none() {
            anyhow::bail!("webhook_url is required for the webhook notifier");
        }

        Ok(())
    }
}
