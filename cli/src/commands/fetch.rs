//! Fetch and history command implementations

use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;
use thermowatch_engine::config::{FeedKind, MonitorConfig};
use thermowatch_engine::evaluator::evaluate;
use thermowatch_engine::feed::HttpFeed;
use thermowatch_engine::retry::retry_with_backoff;
use thermowatch_engine::{build_feed, build_store, store};
use thermowatch_shared::utils::format_celsius;

use crate::output;

/// Pause before the first retry; doubles on each further attempt.
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Attempts before giving up
    #[arg(short, long, default_value = "3")]
    pub retries: u32,

    /// Print the reading as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show at most this many of the newest readings
    #[arg(short, long, default_value = "6")]
    pub limit: usize,

    /// Attempts before giving up
    #[arg(short, long, default_value = "3")]
    pub retries: u32,
}

pub async fn run(args: FetchArgs, config: MonitorConfig) -> Result<()> {
    let feed = build_feed(&config)?;
    let reading = retry_with_backoff("fetch", args.retries, RETRY_DELAY, || feed.fetch_once())
        .await
        .with_context(|| format!("Failed to fetch from {}", feed.describe()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reading)?);
        return Ok(());
    }

    let threshold_store = build_store(&config);
    let thresholds =
        store::load_or_default(threshold_store.as_ref(), config.default_thresholds()?).await;
    let evaluation = evaluate(reading.value(), &thresholds);

    output::reading(&reading, evaluation.in_range);
    match evaluation.violation_message() {
        Some(message) => output::warning(&message),
        None => output::success(&format!(
            "{} is within {}",
            format_celsius(reading.value()),
            thresholds
        )),
    }
    Ok(())
}

pub async fn run_history(args: HistoryArgs, config: MonitorConfig) -> Result<()> {
    if config.feed != FeedKind::Http {
        anyhow::bail!("history is only available for the http feed");
    }
    let endpoint = config
        .feed_endpoint
        .as_deref()
        .context("feed_endpoint is required for the http feed")?;
    let feed = HttpFeed::new(endpoint, config.poll_interval(), config.request_timeout())?;

    let history = retry_with_backoff("history", args.retries, RETRY_DELAY, || {
        feed.fetch_history()
    })
    .await
    .with_context(|| format!("Failed to fetch history from {}", feed.endpoint()))?;

    if history.is_empty() {
        println!("No readings recorded yet.");
        return Ok(());
    }

    let threshold_store = build_store(&config);
    let thresholds =
        store::load_or_default(threshold_store.as_ref(), config.default_thresholds()?).await;

    let skip = history.len().saturating_sub(args.limit);
    println!("{} reading(s), thresholds {}:", history.len() - skip, thresholds);
    for reading in &history[skip..] {
        output::reading(reading, thresholds.contains(reading.value()));
    }
    Ok(())
}
