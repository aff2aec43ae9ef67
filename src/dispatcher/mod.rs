//! Dispatcher module
//!
//! Connects a trade feed to the aggregator through the ingestion queue,
//! either inline in one context or as a feed task plus an aggregation task.
//! On cancellation the feed stops, the queue is closed, and every trade
//! already queued is ingested before `run` returns. Each run gets its own
//! queue, so a dispatcher can be run again after a previous run closed one.

mod shutdown;
mod topology;

pub use shutdown::ShutdownController;
pub use topology::{available_parallelism, Topology, TopologyMode};

use crate::aggregator::VwapAggregator;
use crate::config::Config;
use crate::error::VwapError;
use crate::feed::{TradeEvent, TradeFeed};
use crate::queue::IngestionQueue;
use crate::sink::UpdateSink;
use crate::telemetry::{increment_counter, record_rejection, record_vwap, CounterMetric};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Aggregator handle shared between the consumer and readers
pub type SharedAggregator = Arc<RwLock<VwapAggregator>>;

/// Outcome of a dispatcher run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub topology: Topology,
    /// Trades received from the feed
    pub received: u64,
    /// Trades applied to a window
    pub ingested: u64,
    /// Trades discarded by the aggregator
    pub rejected: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct IngestStats {
    ingested: u64,
    rejected: u64,
}

/// Drives the feed and the aggregator until the feed ends or shutdown
pub struct Dispatcher {
    topology: Topology,
    aggregator: SharedAggregator,
    sink: Arc<dyn UpdateSink>,
}

impl Dispatcher {
    /// Create a dispatcher around an existing aggregator
    pub fn new(aggregator: VwapAggregator, topology: Topology, sink: Arc<dyn UpdateSink>) -> Self {
        Self {
            topology,
            aggregator: Arc::new(RwLock::new(aggregator)),
            sink,
        }
    }

    /// Build the aggregator and pick the topology from configuration
    pub fn from_config(config: &Config, sink: Arc<dyn UpdateSink>) -> Result<Self, VwapError> {
        config.validate()?;
        let aggregator = VwapAggregator::new(
            config.aggregator.pairs.iter().cloned(),
            config.aggregator.window_size,
        )?;
        let topology = Topology::resolve(
            config.dispatcher.topology,
            config.dispatcher.parallelism_threshold,
        );
        Ok(Self::new(aggregator, topology, sink))
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Shared handle for VWAP lookups while or after running
    pub fn aggregator(&self) -> SharedAggregator {
        self.aggregator.clone()
    }

    /// Subscribe to `feed` and aggregate until it ends or `cancel` fires
    pub async fn run(
        &self,
        feed: &dyn TradeFeed,
        cancel: CancellationToken,
    ) -> anyhow::Result<DispatchReport> {
        self.run_with_queue(feed, cancel, Arc::new(IngestionQueue::new()))
            .await
    }

    async fn run_with_queue(
        &self,
        feed: &dyn TradeFeed,
        cancel: CancellationToken,
        queue: Arc<IngestionQueue>,
    ) -> anyhow::Result<DispatchReport> {
        let pairs = self.aggregator.read().await.pairs().to_vec();
        let trade_rx = feed.subscribe(&pairs, cancel.clone()).await?;

        tracing::info!(topology = ?self.topology, pairs = ?pairs, "Dispatcher starting");

        let report = match self.topology {
            Topology::Inline => self.run_inline(trade_rx, &queue, cancel).await,
            Topology::Concurrent => self.run_concurrent(trade_rx, queue, cancel).await?,
        };

        tracing::info!(
            received = report.received,
            ingested = report.ingested,
            rejected = report.rejected,
            "Dispatcher stopped"
        );

        Ok(report)
    }

    /// Push each trade and ingest it before reading the next one
    async fn run_inline(
        &self,
        mut trade_rx: mpsc::Receiver<TradeEvent>,
        queue: &IngestionQueue,
        cancel: CancellationToken,
    ) -> DispatchReport {
        let mut received = 0u64;
        let mut stats = IngestStats::default();

        loop {
            let trade = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                trade = trade_rx.recv() => match trade {
                    Some(trade) => trade,
                    None => break,
                },
            };

            received += 1;
            increment_counter(CounterMetric::EventsReceived);

            if queue.push(trade).is_err() {
                break;
            }
            let mut aggregator = self.aggregator.write().await;
            while let Ok(Some(trade)) = queue.try_pop() {
                ingest_one(&mut aggregator, self.sink.as_ref(), &trade, &mut stats);
            }
        }

        queue.close();
        let mut aggregator = self.aggregator.write().await;
        while let Ok(Some(trade)) = queue.try_pop() {
            ingest_one(&mut aggregator, self.sink.as_ref(), &trade, &mut stats);
        }

        DispatchReport {
            topology: Topology::Inline,
            received,
            ingested: stats.ingested,
            rejected: stats.rejected,
        }
    }

    /// Run the feed unit and the aggregation unit as separate tasks
    async fn run_concurrent(
        &self,
        trade_rx: mpsc::Receiver<TradeEvent>,
        queue: Arc<IngestionQueue>,
        cancel: CancellationToken,
    ) -> anyhow::Result<DispatchReport> {
        let feed_unit = tokio::spawn(Self::feed_unit(trade_rx, queue.clone(), cancel.clone()));
        let aggregation_unit = tokio::spawn(Self::aggregation_unit(
            queue,
            self.aggregator.clone(),
            self.sink.clone(),
            cancel,
        ));

        let (received, stats) = tokio::join!(feed_unit, aggregation_unit);
        let received = received?;
        let stats = stats?;

        Ok(DispatchReport {
            topology: Topology::Concurrent,
            received,
            ingested: stats.ingested,
            rejected: stats.rejected,
        })
    }

    /// Forward every trade into the queue; close it when done
    async fn feed_unit(
        mut trade_rx: mpsc::Receiver<TradeEvent>,
        queue: Arc<IngestionQueue>,
        cancel: CancellationToken,
    ) -> u64 {
        let mut received = 0u64;

        loop {
            let trade = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Feed unit cancelled");
                    break;
                }
                trade = trade_rx.recv() => match trade {
                    Some(trade) => trade,
                    None => {
                        tracing::debug!("Feed ended");
                        break;
                    }
                },
            };

            received += 1;
            increment_counter(CounterMetric::EventsReceived);

            if queue.push(trade).is_err() {
                tracing::debug!("Queue closed, feed unit stopping");
                break;
            }
        }

        queue.close();
        received
    }

    /// Pop and ingest until the queue is closed and drained
    async fn aggregation_unit(
        queue: Arc<IngestionQueue>,
        aggregator: SharedAggregator,
        sink: Arc<dyn UpdateSink>,
        cancel: CancellationToken,
    ) -> IngestStats {
        let mut stats = IngestStats::default();
        let mut closing = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled(), if !closing => {
                    queue.close();
                    closing = true;
                    tracing::debug!(pending = queue.len(), "Draining ingestion queue");
                    continue;
                }
                next = queue.pop() => next,
            };

            match next {
                Ok(trade) => {
                    let mut aggregator = aggregator.write().await;
                    ingest_one(&mut aggregator, sink.as_ref(), &trade, &mut stats);
                }
                Err(_) => break,
            }
        }

        stats
    }
}

/// Ingest one trade, publishing on success and logging on rejection
fn ingest_one(
    aggregator: &mut VwapAggregator,
    sink: &dyn UpdateSink,
    trade: &TradeEvent,
    stats: &mut IngestStats,
) {
    match aggregator.ingest(trade) {
        Ok(update) => {
            stats.ingested += 1;
            record_vwap(&update.pair_id, update.vwap);
            sink.publish(&update);
        }
        Err(e) => {
            stats.rejected += 1;
            record_rejection(e.kind());
            tracing::warn!(pair = %trade.pair_id, error = %e, "Trade rejected");
        }
    }
}
