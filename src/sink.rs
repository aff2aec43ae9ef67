//! Output collaborators for VWAP updates

use crate::aggregator::VwapUpdate;
use tokio::sync::mpsc;

/// Receives the current VWAP after every successfully ingested trade
pub trait UpdateSink: Send + Sync {
    fn publish(&self, update: &VwapUpdate);
}

/// Writes each update to stdout and the log
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    quiet: bool,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log only, without printing to stdout
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    /// Line printed for an update
    pub fn format(update: &VwapUpdate) -> String {
        format!("{} -> {}", update.pair_id, update.vwap)
    }
}

impl UpdateSink for LogSink {
    fn publish(&self, update: &VwapUpdate) {
        if !self.quiet {
            println!("{}", Self::format(update));
        }
        tracing::debug!(
            pair = %update.pair_id,
            vwap = update.vwap,
            window_len = update.window_len,
            "VWAP updated"
        );
    }
}

/// Forwards updates to a channel; a dropped receiver discards them
impl UpdateSink for mpsc::UnboundedSender<VwapUpdate> {
    fn publish(&self, update: &VwapUpdate) {
        let _ = self.send(update.clone());
    }
}
