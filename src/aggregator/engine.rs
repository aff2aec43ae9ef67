//! Sliding-window VWAP aggregator

use super::types::VwapUpdate;
use super::window::PairWindow;
use crate::error::VwapError;
use crate::feed::TradeEvent;
use std::collections::{BTreeMap, HashMap};

/// Default number of trades retained per pair
pub const DEFAULT_WINDOW_SIZE: usize = 200;

/// Keeps one bounded window per configured pair and the VWAP over it
///
/// Owned by a single consumer; readers look VWAPs up by pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VwapAggregator {
    window_size: usize,
    pairs: Vec<String>,
    windows: HashMap<String, PairWindow>,
}

impl VwapAggregator {
    /// Create an aggregator with an empty window for each pair
    pub fn new<I, S>(pairs: I, window_size: usize) -> Result<Self, VwapError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if window_size == 0 {
            return Err(VwapError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }

        let mut ordered = Vec::new();
        let mut windows = HashMap::new();
        for pair in pairs {
            let pair = pair.into();
            if windows.contains_key(&pair) {
                continue;
            }
            windows.insert(pair.clone(), PairWindow::new(window_size));
            ordered.push(pair);
        }

        Ok(Self {
            window_size,
            pairs: ordered,
            windows,
        })
    }

    /// Apply one trade to its pair's window and recompute that pair's VWAP
    ///
    /// Unknown pairs and negative or non-finite values are rejected
    /// without touching any window.
    pub fn ingest(&mut self, event: &TradeEvent) -> Result<VwapUpdate, VwapError> {
        let window = self
            .windows
            .get_mut(&event.pair_id)
            .ok_or_else(|| VwapError::UnknownPair(event.pair_id.clone()))?;

        if !is_valid_quantity(event.price) || !is_valid_quantity(event.size) {
            return Err(VwapError::InvalidTrade {
                pair_id: event.pair_id.clone(),
                price: event.price,
                size: event.size,
            });
        }

        window.push(event.price, event.size);
        let vwap = window.vwap().unwrap_or(0.0);

        Ok(VwapUpdate {
            pair_id: event.pair_id.clone(),
            vwap,
            window_len: window.len(),
            time: event.time,
        })
    }

    /// Last computed VWAP for a pair
    ///
    /// Fails with `UnknownPair` when nothing has been ingested for it.
    pub fn get_vwap(&self, pair_id: &str) -> Result<f64, VwapError> {
        self.windows
            .get(pair_id)
            .and_then(PairWindow::vwap)
            .ok_or_else(|| VwapError::UnknownPair(pair_id.to_string()))
    }

    /// Window for a configured pair
    pub fn window(&self, pair_id: &str) -> Option<&PairWindow> {
        self.windows.get(pair_id)
    }

    /// Configured pairs in configuration order
    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// VWAP of every pair that has data
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.windows
            .iter()
            .filter_map(|(pair, window)| window.vwap().map(|vwap| (pair.clone(), vwap)))
            .collect()
    }
}

fn is_valid_quantity(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
