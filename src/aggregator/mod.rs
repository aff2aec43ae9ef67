//! VWAP aggregation module
//!
//! Maintains a bounded window of the most recent trades per pair, with
//! running notional/size sums so each ingest is O(1).

mod engine;
mod types;
mod window;

pub use engine::{VwapAggregator, DEFAULT_WINDOW_SIZE};
pub use types::VwapUpdate;
pub use window::{PairWindow, WindowEntry};
