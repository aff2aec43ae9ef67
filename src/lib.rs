//! pair-vwap: Sliding-window VWAP per trading pair
//!
//! This library provides:
//! - A bounded per-pair trade window with O(1) running VWAP
//! - An unbounded FIFO ingestion queue with close/drain semantics
//! - A dispatcher running feed and aggregation inline or as two tasks
//! - Coinbase WebSocket and file replay trade feeds
//! - Structured logging and Prometheus metrics

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod queue;
pub mod sink;
pub mod telemetry;
pub mod ws;

pub use aggregator::{PairWindow, VwapAggregator, VwapUpdate};
pub use dispatcher::{DispatchReport, Dispatcher, Topology};
pub use error::VwapError;
pub use feed::{TradeEvent, TradeFeed};
pub use queue::IngestionQueue;
