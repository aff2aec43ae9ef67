//! Trade feed types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single executed trade, as handed to the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Trading pair (e.g., "BTC-USD")
    pub pair_id: String,
    /// Execution price
    pub price: f64,
    /// Executed quantity
    pub size: f64,
    /// Upstream trade id, when the feed provides one
    #[serde(default)]
    pub trade_id: Option<u64>,
    /// Exchange execution time, when the feed provides one
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl TradeEvent {
    /// Create a trade event without upstream metadata
    pub fn new(pair_id: impl Into<String>, price: f64, size: f64) -> Self {
        Self {
            pair_id: pair_id.into(),
            price,
            size,
            trade_id: None,
            time: None,
        }
    }

    /// Attach the upstream trade id
    pub fn with_trade_id(mut self, trade_id: u64) -> Self {
        self.trade_id = Some(trade_id);
        self
    }

    /// Attach the exchange execution time
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }
}
