//! CLI interface for pair-vwap
//!
//! Provides subcommands for:
//! - `run`: Aggregate the live Coinbase trade feed
//! - `replay`: Aggregate recorded Coinbase messages from a file
//! - `config`: Show the effective configuration

mod replay;
mod run;

pub use replay::ReplayArgs;
pub use run::RunArgs;

use crate::config::Config;
use crate::dispatcher::{DispatchReport, Dispatcher, ShutdownController};
use crate::feed::TradeFeed;
use crate::sink::LogSink;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "pair-vwap")]
#[command(about = "Sliding-window VWAP per trading pair from the Coinbase trade feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate the live Coinbase feed until Ctrl+C
    Run(RunArgs),
    /// Aggregate recorded feed messages from a file
    Replay(ReplayArgs),
    /// Show the effective configuration
    Config,
}

/// Overrides shared by `run` and `replay`
#[derive(Args, Debug, Default)]
pub struct AggregationArgs {
    /// Pairs to aggregate, comma separated
    #[arg(long, value_delimiter = ',')]
    pub pairs: Vec<String>,

    /// Trades retained per pair
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Log VWAP updates without printing them
    #[arg(short, long)]
    pub quiet: bool,
}

impl AggregationArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if !self.pairs.is_empty() {
            config.aggregator.pairs = self.pairs.clone();
        }
        if let Some(window) = self.window {
            config.aggregator.window_size = window;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Run `feed` through a dispatcher until it ends or Ctrl+C
async fn dispatch(
    config: &Config,
    feed: &dyn TradeFeed,
    quiet: bool,
) -> anyhow::Result<DispatchReport> {
    let sink = if quiet {
        LogSink::quiet()
    } else {
        LogSink::new()
    };
    let dispatcher = Dispatcher::from_config(config, Arc::new(sink))?;
    let shutdown = ShutdownController::with_ctrl_c();

    let report = dispatcher.run(feed, shutdown.token()).await?;

    let aggregator = dispatcher.aggregator();
    for (pair, vwap) in aggregator.read().await.snapshot() {
        tracing::info!(pair = %pair, vwap, "Final VWAP");
    }

    Ok(report)
}

/// Print the effective configuration
pub fn show_config(config: &Config) {
    println!("Current configuration:");
    println!(
        "  Aggregator: window={} pairs={}",
        config.aggregator.window_size,
        config.aggregator.pairs.join(",")
    );
    println!(
        "  Dispatcher: topology={:?} parallelism_threshold={} (available={})",
        config.dispatcher.topology,
        config.dispatcher.parallelism_threshold,
        crate::dispatcher::available_parallelism()
    );
    println!("  Feed: {} channel={}", config.feed.url, config.feed.channel);
    println!(
        "  Telemetry: level={} format={:?} metrics_port={:?}",
        config.telemetry.log_level, config.telemetry.log_format, config.telemetry.metrics_port
    );
}
