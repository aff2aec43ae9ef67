//! Trade feed module
//!
//! Sources of executed trades: the live Coinbase WebSocket and a file replay
//! of recorded Coinbase messages. Both share one message parser.

mod coinbase;
mod replay;
mod types;

pub use coinbase::{parse_message, subscription_message, CoinbaseFeed};
pub use replay::ReplayFeed;
pub use types::TradeEvent;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Trait for trade feed implementations
#[async_trait]
pub trait TradeFeed: Send + Sync {
    /// Subscribe to executed trades for `pairs`
    ///
    /// The returned channel closes when the feed ends or `cancel` fires.
    async fn subscribe(
        &self,
        pairs: &[String],
        cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<TradeEvent>>;
}
