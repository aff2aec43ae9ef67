//! Replay command implementation

use super::{dispatch, AggregationArgs};
use crate::config::Config;
use crate::feed::ReplayFeed;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// File with one Coinbase feed message per line
    pub file: PathBuf,

    #[command(flatten)]
    pub aggregation: AggregationArgs,
}

impl ReplayArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let config = self.aggregation.apply(config)?;

        tracing::info!("Replaying {:?}...", self.file);

        let feed = ReplayFeed::new(&self.file);
        let report = dispatch(&config, &feed, self.aggregation.quiet).await?;

        println!(
            "Replayed {} trades: {} ingested, {} rejected ({:?})",
            report.received, report.ingested, report.rejected, report.topology
        );
        Ok(())
    }
}
