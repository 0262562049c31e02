//! Thresholds command implementation

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use thermowatch_engine::config::MonitorConfig;
use thermowatch_engine::{audit, build_store};
use thermowatch_shared::{ThresholdField, Thresholds};

use crate::output;

#[derive(Subcommand, Debug)]
pub enum ThresholdsCommand {
    /// Print the stored thresholds (or the defaults when nothing is stored)
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one or both bounds
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// New lower bound in °C
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<f64>,

    /// New upper bound in °C
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<f64>,
}

pub async fn run(cmd: ThresholdsCommand, config: MonitorConfig) -> Result<()> {
    let store = build_store(&config);
    let defaults = config.default_thresholds()?;

    match cmd {
        ThresholdsCommand::Show { json } => {
            let stored = store.load().await.context("Failed to read thresholds")?;
            let thresholds = stored.unwrap_or(defaults);
            if json {
                println!("{}", serde_json::to_string_pretty(&thresholds)?);
            } else if stored.is_some() {
                output::info(&format!("Thresholds {} ({})", thresholds, store.describe()));
            } else {
                output::info(&format!("Thresholds {} (defaults, nothing stored)", thresholds));
            }
        }

        ThresholdsCommand::Set(args) => {
            if args.min.is_none() && args.max.is_none() {
                anyhow::bail!("Nothing to set: pass --min and/or --max");
            }

            let current = thermowatch_engine::store::load_or_default(store.as_ref(), defaults).await;
            let updated = Thresholds::new(
                args.min.unwrap_or(current.min()),
                args.max.unwrap_or(current.max()),
            )?;

            store
                .save(&updated)
                .await
                .context("Failed to save thresholds")?;

            for (field, value) in [(ThresholdField::Min, args.min), (ThresholdField::Max, args.max)] {
                if value.is_some() {
                    audit::thresholds_committed(field, &current, &updated);
                }
            }
            output::success(&format!("Thresholds set to {}", updated));
        }
    }

    Ok(())
}
