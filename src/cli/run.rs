//! Run command implementation

use super::{dispatch, AggregationArgs};
use crate::config::Config;
use crate::feed::CoinbaseFeed;
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub aggregation: AggregationArgs,

    /// Coinbase channel to subscribe to ("matches" or "full")
    #[arg(long)]
    pub channel: Option<String>,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let mut config = self.aggregation.apply(config)?;
        if let Some(ref channel) = self.channel {
            config.feed.channel = channel.clone();
        }

        tracing::info!(
            pairs = ?config.aggregator.pairs,
            window = config.aggregator.window_size,
            "Starting live VWAP aggregation"
        );

        let feed = CoinbaseFeed::new(config.feed.clone());
        let report = dispatch(&config, &feed, self.aggregation.quiet).await?;

        tracing::info!(
            received = report.received,
            ingested = report.ingested,
            "Live aggregation stopped"
        );
        Ok(())
    }
}
