//! Aggregator output types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current VWAP for a pair after an ingested trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VwapUpdate {
    /// Trading pair the update belongs to
    pub pair_id: String,
    /// VWAP over the pair's current window
    pub vwap: f64,
    /// Number of trades in the window after ingestion
    pub window_len: usize,
    /// Exchange time of the trade that produced this update
    pub time: Option<DateTime<Utc>>,
}
