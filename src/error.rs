//! Error types shared by the feed, queue and aggregator

use thiserror::Error;

/// Per-event and lifecycle errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VwapError {
    /// Numeric fields of an upstream message could not be parsed
    #[error("Malformed trade event: {0}")]
    MalformedTradeEvent(String),
    /// Pair outside the configured set, or with no data yet on lookup
    #[error("Unknown pair: {0}")]
    UnknownPair(String),
    /// Negative or non-finite price/size
    #[error("Invalid trade for {pair_id}: price={price}, size={size}")]
    InvalidTrade {
        pair_id: String,
        price: f64,
        size: f64,
    },
    /// The ingestion queue no longer accepts or yields events
    #[error("Ingestion queue closed")]
    QueueClosed,
    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VwapError {
    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            VwapError::MalformedTradeEvent(_) => "malformed",
            VwapError::UnknownPair(_) => "unknown_pair",
            VwapError::InvalidTrade { .. } => "invalid_trade",
            VwapError::QueueClosed => "queue_closed",
            VwapError::InvalidConfig(_) => "invalid_config",
        }
    }
}
