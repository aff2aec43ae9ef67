//! Replay of recorded Coinbase messages from a file

use super::coinbase::parse_message;
use super::{TradeEvent, TradeFeed};
use crate::telemetry::record_rejection;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Feed that reads one Coinbase JSON message per line
///
/// Trades for pairs outside the subscription are skipped, as the
/// exchange would not have sent them.
pub struct ReplayFeed {
    path: PathBuf,
}

impl ReplayFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn run_replay(
        file: File,
        pairs: HashSet<String>,
        trade_tx: mpsc::Sender<TradeEvent>,
        cancel: CancellationToken,
    ) {
        let mut lines = BufReader::new(file).lines();
        let mut line_no = 0usize;

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read replay file");
                    break;
                }
            };
            line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            match parse_message(&line) {
                Ok(Some(trade)) if pairs.contains(&trade.pair_id) => {
                    if trade_tx.send(trade).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    record_rejection(e.kind());
                    tracing::warn!(line = line_no, error = %e, "Skipping malformed replay line");
                }
            }
        }

        tracing::info!(lines = line_no, "Replay finished");
    }
}

#[async_trait]
impl TradeFeed for ReplayFeed {
    async fn subscribe(
        &self,
        pairs: &[String],
        cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<TradeEvent>> {
        let file = File::open(&self.path).await.map_err(|e| {
            anyhow::anyhow!("Failed to open replay file {}: {}", self.path.display(), e)
        })?;

        tracing::info!(path = %self.path.display(), "Replaying recorded feed");

        let (trade_tx, trade_rx) = mpsc::channel(1024);
        let pairs = pairs.iter().cloned().collect();
        tokio::spawn(Self::run_replay(file, pairs, trade_tx, cancel));

        Ok(trade_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_lines(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_replay_yields_subscribed_trades_in_order() {
        let file = write_lines(&[
            r#"{"type":"subscriptions","channels":[]}"#,
            r#"{"type":"match","product_id":"BTC-USD","price":"100","size":"1"}"#,
            "",
            "not json",
            r#"{"type":"match","product_id":"DOGE-USD","price":"1","size":"1"}"#,
            r#"{"type":"match","product_id":"BTC-USD","price":"200","size":"2"}"#,
        ]);

        let feed = ReplayFeed::new(file.path());
        let mut rx = feed
            .subscribe(&["BTC-USD".to_string()], CancellationToken::new())
            .await
            .unwrap();

        let mut prices = Vec::new();
        while let Some(trade) = rx.recv().await {
            prices.push(trade.price);
        }
        assert_eq!(prices, vec![100.0, 200.0]);
    }

    #[tokio::test]
    async fn test_replay_missing_file() {
        let feed = ReplayFeed::new("/nonexistent/feed.jsonl");
        let result = feed
            .subscribe(&["BTC-USD".to_string()], CancellationToken::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_replay_stops_on_cancel() {
        let file = write_lines(&[
            r#"{"type":"match","product_id":"BTC-USD","price":"100","size":"1"}"#,
        ]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let feed = ReplayFeed::new(file.path());
        let mut rx = feed
            .subscribe(&["BTC-USD".to_string()], cancel)
            .await
            .unwrap();

        // A cancelled replay may end before or after the first line
        while rx.recv().await.is_some() {}
    }
}
