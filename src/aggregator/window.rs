//! Bounded per-pair trade window with running sums

use std::collections::VecDeque;

/// One retained trade: (notional, size)
pub type WindowEntry = (f64, f64);

/// FIFO window of the most recent trades for one pair
///
/// `running_notional` and `running_size` always equal the sums over
/// `entries`, and `entries.len()` never exceeds `capacity`. Once no retained
/// entry carries volume both sums are reset to exactly zero, so rounding
/// residue left by evictions never turns into a price.
#[derive(Debug, Clone, PartialEq)]
pub struct PairWindow {
    capacity: usize,
    entries: VecDeque<WindowEntry>,
    running_notional: f64,
    running_size: f64,
    /// Retained entries with `size > 0`
    volume_entries: usize,
    vwap: Option<f64>,
}

impl PairWindow {
    /// Create an empty window holding at most `capacity` trades
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            running_notional: 0.0,
            running_size: 0.0,
            volume_entries: 0,
            vwap: None,
        }
    }

    /// Append a trade, evicting the oldest one first if the window is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, price: f64, size: f64) -> Option<WindowEntry> {
        let evicted = if self.entries.len() == self.capacity {
            self.evict_oldest()
        } else {
            None
        };

        let notional = price * size;
        self.entries.push_back((notional, size));
        self.running_notional += notional;
        self.running_size += size;
        if size > 0.0 {
            self.volume_entries += 1;
        }
        if self.volume_entries == 0 {
            self.running_notional = 0.0;
            self.running_size = 0.0;
        }

        self.vwap = Some(if self.volume_entries > 0 && self.running_size > 0.0 {
            self.running_notional / self.running_size
        } else {
            0.0
        });

        evicted
    }

    fn evict_oldest(&mut self) -> Option<WindowEntry> {
        let (notional, size) = self.entries.pop_front()?;
        self.running_notional -= notional;
        self.running_size -= size;
        if size > 0.0 {
            self.volume_entries -= 1;
        }
        Some((notional, size))
    }

    /// Last computed VWAP, `None` until the first trade
    pub fn vwap(&self) -> Option<f64> {
        self.vwap
    }

    pub fn running_notional(&self) -> f64 {
        self.running_notional
    }

    pub fn running_size(&self) -> f64 {
        self.running_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of trades currently retained
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Retained entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &WindowEntry> {
        self.entries.iter()
    }
}
