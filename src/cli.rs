//! Command-line interface
//!
//! The external periodic trigger from the original design is the `watch`
//! command: a tokio interval that fires a sorting pass on a fixed period,
//! with an initial startup delay. `run` performs a single pass and `reset`
//! undoes all label actions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::MailGateway;
use crate::models::{ResetSummary, RunOutcome};
use crate::notify::Notifier;
use crate::pipeline::Processor;
use crate::reset::ResetCoordinator;
use crate::store::KeyValueStore;

#[derive(Parser, Debug)]
#[command(name = "gmail-sorter")]
#[command(version)]
#[command(about = "Periodic Gmail inbox sorter driven by an LLM classifier", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single sorting pass
    Run,

    /// Run sorting passes on a fixed period until interrupted
    Watch,

    /// Move all sorted messages back to the inbox, delete their labels, and
    /// clear category/history state
    Reset,

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Run one pass and log its outcome
pub async fn run_once<G, C, S, N>(processor: &Processor<G, C, S, N>) -> Result<RunOutcome>
where
    G: MailGateway,
    C: Classifier,
    S: KeyValueStore,
    N: Notifier,
{
    let outcome = processor.run().await?;
    match &outcome {
        RunOutcome::Completed(summary) => {
            info!(
                "Processed {} message(s) ({} skipped) in run {}",
                summary.processed, summary.skipped, summary.run_id
            );
        }
        RunOutcome::Skipped(reason) => {
            info!("Pass skipped: {}", reason);
        }
    }
    Ok(outcome)
}

/// Fire sorting passes on the configured period until interrupted
///
/// Run-level errors are logged and the loop continues; the next tick gets a
/// fresh attempt. Overlap is impossible regardless of timing because the
/// processor's run lock skips a pass that catches a previous one in flight.
pub async fn watch<G, C, S, N>(processor: &Processor<G, C, S, N>, config: &Config) -> Result<()>
where
    G: MailGateway,
    C: Classifier,
    S: KeyValueStore,
    N: Notifier,
{
    let initial_delay = Duration::from_secs(config.schedule.initial_delay_secs);
    let period = Duration::from_secs(config.schedule.interval_secs);

    info!(
        "Watching inbox: first pass in {:?}, then every {:?}",
        initial_delay, period
    );
    if !initial_delay.is_zero() {
        tokio::time::sleep(initial_delay).await;
    }

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if let Err(e) = run_once(processor).await {
            error!("Sorting pass failed: {}", e);
        }
    }
}

/// Run the reset coordinator and log its outcome
pub async fn run_reset<G, S>(coordinator: &ResetCoordinator<G, S>) -> Result<ResetSummary>
where
    G: MailGateway,
    S: KeyValueStore,
{
    let summary = coordinator.run().await?;
    if summary.labels_matched == 0 {
        info!("Reset: nothing to undo");
    } else {
        info!(
            "Reset: moved {} message(s), deleted {}/{} label(s)",
            summary.messages_moved, summary.labels_deleted, summary.labels_matched
        );
        if summary.failures > 0 {
            warn!("Reset left {} operation(s) unfinished", summary.failures);
        }
    }
    Ok(summary)
}
