//! Monitor command implementation
//!
//! Runs the engine against the configured feed and prints every reading and
//! alert. While running, lines typed on stdin edit the thresholds:
//! `min <value>`, `max <value>`, `reset`, `status`.

use anyhow::{Context, Result};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thermowatch_engine::config::MonitorConfig;
use thermowatch_engine::server::http::serve_admin;
use thermowatch_engine::{EngineSnapshot, MonitoringEngine};
use thermowatch_shared::utils::parse_duration;
use thermowatch_shared::{Alert, Reading, ThresholdField};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::output;

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Stop after this long (e.g., "30s", "5m"); runs until Ctrl-C when omitted
    #[arg(short, long)]
    pub duration: Option<String>,

    /// Print each engine snapshot as JSON instead of formatted lines
    #[arg(long)]
    pub json: bool,

    /// Admin HTTP listen address, overrides `admin_addr` from the config
    #[arg(long)]
    pub admin_addr: Option<String>,

    /// Ignore stdin instead of reading threshold edits from it
    #[arg(long)]
    pub no_console: bool,
}

pub async fn run(args: MonitorArgs, config: MonitorConfig) -> Result<()> {
    let duration = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Failed to parse duration")?;

    let engine = Arc::new(thermowatch_engine::build_engine(&config)?);
    let shutdown = CancellationToken::new();

    let admin = match args.admin_addr.as_ref().or(config.admin_addr.as_ref()) {
        Some(addr) => {
            let addr: SocketAddr = addr.parse().context("Invalid admin address")?;
            Some(tokio::spawn(serve_admin(
                addr,
                engine.clone(),
                shutdown.clone(),
            )))
        }
        None => None,
    };

    engine.start().await?;
    output::info(&format!(
        "Monitoring with thresholds {} (history of {} readings)",
        engine.committed_thresholds(),
        config.history_capacity
    ));

    let mut updates = engine.watch();
    let mut reporter = Reporter::new(args.json);
    let mut console = (!args.no_console).then(|| BufReader::new(tokio::io::stdin()).lines());

    let deadline = tokio::time::sleep(duration.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                output::info("Interrupted");
                break;
            }
            _ = &mut deadline, if duration.is_some() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                reporter.report(&snapshot)?;
            }
            line = next_line(&mut console), if console.is_some() => match line {
                Some(line) => handle_console(&engine, &line).await,
                None => console = None,
            },
        }
    }

    engine.stop().await;
    shutdown.cancel();
    if let Some(admin) = admin {
        match admin.await {
            Ok(Err(e)) => warn!("Admin server error: {}", e),
            Err(e) => warn!("Admin server task failed: {}", e),
            Ok(Ok(())) => {}
        }
    }

    output::success("Monitor stopped");
    Ok(())
}

type Console = tokio::io::Lines<BufReader<tokio::io::Stdin>>;

/// Next stdin line, or `None` once stdin is closed or unreadable.
async fn next_line(console: &mut Option<Console>) -> Option<String> {
    let lines = console.as_mut()?;
    match lines.next_line().await {
        Ok(line) => line,
        Err(e) => {
            warn!("Stopped reading stdin: {}", e);
            None
        }
    }
}

#[derive(Debug, PartialEq)]
enum ConsoleCommand {
    Edit(ThresholdField, String),
    Reset,
    Status,
    Help,
}

fn parse_console(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let rest = parts.collect::<Vec<_>>().join(" ");

    match command.to_lowercase().as_str() {
        "min" => Some(ConsoleCommand::Edit(ThresholdField::Min, rest)),
        "max" => Some(ConsoleCommand::Edit(ThresholdField::Max, rest)),
        "reset" => Some(ConsoleCommand::Reset),
        "status" => Some(ConsoleCommand::Status),
        "help" | "?" => Some(ConsoleCommand::Help),
        _ => None,
    }
}

async fn handle_console(engine: &MonitoringEngine, line: &str) {
    let Some(command) = parse_console(line) else {
        if !line.trim().is_empty() {
            output::warning(&format!("Unknown command: {}", line.trim()));
        }
        return;
    };

    match command {
        ConsoleCommand::Edit(field, raw) => {
            if !engine.update_threshold_input(field, &raw) {
                output::warning(&format!("'{}' is not a number", raw));
                return;
            }
            match engine.commit_threshold(field, &raw).await {
                Ok(thresholds) => output::success(&format!("Thresholds set to {}", thresholds)),
                Err(e) => {
                    let message = engine.input_error_message().unwrap_or_else(|| e.to_string());
                    output::error(&message);
                }
            }
        }
        ConsoleCommand::Reset => {
            engine.reset();
            output::info("History and alert memory cleared");
        }
        ConsoleCommand::Status => {
            let snapshot = engine.snapshot();
            output::info(&format!(
                "{} | thresholds {} | {} readings | {}",
                snapshot.lifecycle.as_str(),
                snapshot.thresholds,
                snapshot.history.len(),
                if snapshot.within_thresholds {
                    "within thresholds"
                } else {
                    "out of range"
                }
            ));
        }
        ConsoleCommand::Help => {
            output::info("min <value> | max <value> | reset | status");
        }
    }
}

/// Prints what changed between consecutive snapshots.
///
/// Tracks the engine's arrival counters rather than timestamps, so readings
/// a feed delivers out of order are still reported.
struct Reporter {
    json: bool,
    readings_seen: u64,
    alerts_seen: u64,
}

impl Reporter {
    fn new(json: bool) -> Self {
        Self {
            json,
            readings_seen: 0,
            alerts_seen: 0,
        }
    }

    /// Readings and alerts that arrived since the previous call, oldest first.
    fn fresh<'a>(&mut self, snapshot: &'a EngineSnapshot) -> (&'a [Reading], Vec<&'a Alert>) {
        let new_readings = snapshot.readings_received.saturating_sub(self.readings_seen);
        let new_alerts = snapshot.alerts_fired.saturating_sub(self.alerts_seen);
        self.readings_seen = snapshot.readings_received;
        self.alerts_seen = snapshot.alerts_fired;

        let history = &snapshot.history;
        let take = usize::try_from(new_readings)
            .unwrap_or(usize::MAX)
            .min(history.len());
        let alerts = snapshot
            .recent_alerts
            .iter()
            .take(usize::try_from(new_alerts).unwrap_or(usize::MAX))
            .rev()
            .collect();
        (&history[history.len() - take..], alerts)
    }

    fn report(&mut self, snapshot: &EngineSnapshot) -> Result<()> {
        let (fresh_readings, fresh_alerts) = self.fresh(snapshot);

        if self.json {
            if !fresh_readings.is_empty() || !fresh_alerts.is_empty() {
                println!("{}", serde_json::to_string(snapshot)?);
            }
            return Ok(());
        }

        for reading in fresh_readings {
            output::reading(reading, snapshot.thresholds.contains(reading.value()));
        }
        for alert in fresh_alerts {
            output::alert(alert);
        }
        Ok(())
    }
}
