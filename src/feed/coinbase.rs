//! Coinbase Exchange WebSocket trade feed

use super::{TradeEvent, TradeFeed};
use crate::config::FeedConfig;
use crate::error::VwapError;
use crate::telemetry::record_rejection;
use crate::ws::{WsClient, WsConfig, WsMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Numeric field as sent upstream: normally a decimal string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumericField {
    Text(String),
    Number(f64),
}

impl NumericField {
    fn parse(&self, field: &str) -> Result<f64, VwapError> {
        match self {
            NumericField::Text(text) => text.trim().parse::<f64>().map_err(|e| {
                VwapError::MalformedTradeEvent(format!("{}={:?}: {}", field, text, e))
            }),
            NumericField::Number(value) => Ok(*value),
        }
    }
}

/// Fields of a Coinbase `match` message used here
#[derive(Debug, Deserialize)]
struct MatchMessage {
    product_id: Option<String>,
    price: Option<NumericField>,
    size: Option<NumericField>,
    trade_id: Option<u64>,
    time: Option<String>,
}

/// Build the subscribe request for `pairs` on `channel`
pub fn subscription_message(pairs: &[String], channel: &str) -> String {
    json!({
        "type": "subscribe",
        "product_ids": pairs,
        "channels": [channel],
    })
    .to_string()
}

/// Parse one Coinbase message
///
/// `Ok(None)` for anything that is not an executed trade. `last_match` is
/// ignored too: it is resent on every (re)subscribe and repeats a trade that
/// was already delivered as `match`. Price and size are converted from their
/// textual form exactly once, here.
pub fn parse_message(msg: &str) -> Result<Option<TradeEvent>, VwapError> {
    let value: Value = serde_json::from_str(msg)
        .map_err(|e| VwapError::MalformedTradeEvent(format!("invalid json: {}", e)))?;

    match value.get("type").and_then(Value::as_str) {
        Some("match") => {}
        Some("error") => {
            let error_message = text_field(&value, "message");
            let reason = text_field(&value, "reason");
            tracing::warn!(error_message, reason, "Coinbase feed reported an error");
            return Ok(None);
        }
        _ => return Ok(None),
    }

    let message: MatchMessage = serde_json::from_value(value)
        .map_err(|e| VwapError::MalformedTradeEvent(format!("invalid match: {}", e)))?;

    let pair_id = message
        .product_id
        .ok_or_else(|| VwapError::MalformedTradeEvent("missing product_id".to_string()))?;
    let price = message
        .price
        .ok_or_else(|| VwapError::MalformedTradeEvent("missing price".to_string()))?
        .parse("price")?;
    let size = message
        .size
        .ok_or_else(|| VwapError::MalformedTradeEvent("missing size".to_string()))?
        .parse("size")?;

    let mut trade = TradeEvent::new(pair_id, price, size);
    if let Some(trade_id) = message.trade_id {
        trade = trade.with_trade_id(trade_id);
    }
    if let Some(time) = message
        .time
        .as_deref()
        .and_then(|t| t.parse::<DateTime<Utc>>().ok())
    {
        trade = trade.with_time(time);
    }

    Ok(Some(trade))
}

fn text_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Coinbase WebSocket feed of `match` messages
pub struct CoinbaseFeed {
    config: FeedConfig,
}

impl CoinbaseFeed {
    /// Create a new Coinbase feed
    pub fn new(config: FeedConfig) -> Self {
        Self { config }
    }

    fn ws_config(&self, pairs: &[String]) -> WsConfig {
        WsConfig::new(self.config.url.clone())
            .max_reconnects(self.config.max_reconnects)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .ping_interval(Duration::from_secs(self.config.ping_interval_secs.max(1)))
            .subscribe_with(subscription_message(pairs, &self.config.channel))
    }

    /// Run the message processing loop
    async fn run_message_loop(
        mut ws_rx: mpsc::Receiver<WsMessage>,
        trade_tx: mpsc::Sender<TradeEvent>,
    ) {
        while let Some(msg) = ws_rx.recv().await {
            match msg {
                WsMessage::Text(text) => match parse_message(&text) {
                    Ok(Some(trade)) => {
                        if trade_tx.send(trade).await.is_err() {
                            tracing::debug!("Trade receiver dropped, stopping feed");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        record_rejection(e.kind());
                        tracing::warn!(error = %e, "Discarding malformed trade message");
                    }
                },
                WsMessage::Connected => {
                    tracing::info!("Coinbase feed connected");
                }
                WsMessage::Disconnected => {
                    tracing::warn!("Coinbase feed disconnected");
                    break;
                }
                WsMessage::Reconnecting { attempt } => {
                    tracing::warn!(attempt, "Coinbase feed reconnecting...");
                }
            }
        }
    }
}

#[async_trait]
impl TradeFeed for CoinbaseFeed {
    async fn subscribe(
        &self,
        pairs: &[String],
        cancel: CancellationToken,
    ) -> anyhow::Result<mpsc::Receiver<TradeEvent>> {
        let (trade_tx, trade_rx) = mpsc::channel(1024);

        tracing::info!(
            url = %self.config.url,
            channel = %self.config.channel,
            pairs = ?pairs,
            "Subscribing to Coinbase feed"
        );

        let client = WsClient::new(self.ws_config(pairs));
        let ws_rx = client.connect(cancel);

        tokio::spawn(async move {
            Self::run_message_loop(ws_rx, trade_tx).await;
        });

        Ok(trade_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<String> {
        vec!["BTC-USD".to_string(), "ETH-USD".to_string()]
    }

    #[test]
    fn test_subscription_message() {
        let msg = subscription_message(&pairs(), "matches");
        let value: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["type"], "subscribe");
        assert_eq!(value["product_ids"][0], "BTC-USD");
        assert_eq!(value["product_ids"][1], "ETH-USD");
        assert_eq!(value["channels"][0], "matches");
    }

    #[test]
    fn test_ws_config_carries_subscription() {
        let feed = CoinbaseFeed::new(FeedConfig::default());
        let config = feed.ws_config(&pairs());
        assert_eq!(config.url, "wss://ws-feed.exchange.coinbase.com");
        assert_eq!(config.max_reconnect_attempts, 0);
        assert!(config
            .subscribe_message
            .unwrap()
            .contains(r#""product_ids":["BTC-USD","ETH-USD"]"#));
    }

    #[test]
    fn test_parse_valid_match_message() {
        let msg = r#"{
            "type": "match",
            "trade_id": 10,
            "sequence": 50,
            "maker_order_id": "ac928c66-ca53-498f-9c13-a110027a60e8",
            "taker_order_id": "132fb6ae-456b-4654-b4e0-d681ac05cea1",
            "time": "2014-11-07T08:19:27.028459Z",
            "product_id": "BTC-USD",
            "size": "5.23512",
            "price": "400.23",
            "side": "sell"
        }"#;

        let trade = parse_message(msg).unwrap().unwrap();
        assert_eq!(trade.pair_id, "BTC-USD");
        assert_eq!(trade.price, 400.23);
        assert_eq!(trade.size, 5.23512);
        assert_eq!(trade.trade_id, Some(10));
        assert!(trade.time.is_some());
    }

    #[test]
    fn test_parse_numeric_fields() {
        let msg = r#"{"type":"match","product_id":"ETH-BTC","price":0.05,"size":2}"#;
        let trade = parse_message(msg).unwrap().unwrap();
        assert_eq!(trade.price, 0.05);
        assert_eq!(trade.size, 2.0);
        assert!(trade.time.is_none());
    }

    #[test]
    fn test_resubscribe_last_match_is_not_ingested_twice() {
        let matched =
            r#"{"type":"match","trade_id":10,"product_id":"BTC-USD","price":"400","size":"1"}"#;
        let replayed = r#"{"type":"last_match","trade_id":10,"product_id":"BTC-USD","price":"400","size":"1"}"#;

        let mut agg = crate::VwapAggregator::new(["BTC-USD"], 200).unwrap();
        for msg in [matched, replayed] {
            if let Some(trade) = parse_message(msg).unwrap() {
                agg.ingest(&trade).unwrap();
            }
        }

        assert_eq!(parse_message(replayed).unwrap(), None);
        assert_eq!(agg.window("BTC-USD").unwrap().len(), 1);
        assert_eq!(agg.get_vwap("BTC-USD").unwrap(), 400.0);
    }

    #[test]
    fn test_parse_ignores_non_trade_types() {
        for msg in [
            r#"{"type":"subscriptions","channels":[]}"#,
            r#"{"type":"received","product_id":"BTC-USD","price":"1","size":"1"}"#,
            r#"{"type":"heartbeat","product_id":"BTC-USD"}"#,
            r#"{"type":"error","message":"Failed to subscribe","reason":"bad product"}"#,
        ] {
            assert_eq!(parse_message(msg).unwrap(), None, "{msg}");
        }
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_message("not json"),
            Err(VwapError::MalformedTradeEvent(_))
        ));
    }

    #[test]
    fn test_parse_unparseable_numbers() {
        let msg = r#"{"type":"match","product_id":"BTC-USD","price":"abc","size":"1"}"#;
        let err = parse_message(msg).unwrap_err();
        assert!(matches!(err, VwapError::MalformedTradeEvent(ref m) if m.contains("price")));
    }

    #[test]
    fn test_parse_missing_fields() {
        let msg = r#"{"type":"match","product_id":"BTC-USD","price":"1"}"#;
        assert!(matches!(
            parse_message(msg),
            Err(VwapError::MalformedTradeEvent(_))
        ));

        let msg = r#"{"type":"match","price":"1","size":"1"}"#;
        assert!(matches!(
            parse_message(msg),
            Err(VwapError::MalformedTradeEvent(_))
        ));
    }

    #[test]
    fn test_parse_keeps_negative_values_for_aggregator() {
        let msg = r#"{"type":"match","product_id":"BTC-USD","price":"-1","size":"1"}"#;
        let trade = parse_message(msg).unwrap().unwrap();
        assert_eq!(trade.price, -1.0);
    }

    #[tokio::test]
    async fn test_message_loop_forwards_trades() {
        let (ws_tx, ws_rx) = mpsc::channel(10);
        let (trade_tx, mut trade_rx) = mpsc::channel(10);

        let handle = tokio::spawn(async move {
            CoinbaseFeed::run_message_loop(ws_rx, trade_tx).await;
        });

        ws_tx.send(WsMessage::Connected).await.unwrap();
        ws_tx
            .send(WsMessage::Text(
                r#"{"type":"subscriptions","channels":[]}"#.to_string(),
            ))
            .await
            .unwrap();
        ws_tx
            .send(WsMessage::Text("garbage".to_string()))
            .await
            .unwrap();
        ws_tx
            .send(WsMessage::Text(
                r#"{"type":"match","product_id":"ETH-USD","price":"2000.5","size":"0.1"}"#
                    .to_string(),
            ))
            .await
            .unwrap();

        let trade = trade_rx.recv().await.unwrap();
        assert_eq!(trade.pair_id, "ETH-USD");
        assert_eq!(trade.price, 2000.5);

        ws_tx.send(WsMessage::Disconnected).await.unwrap();
        handle.await.unwrap();
        assert!(trade_rx.recv().await.is_none());
    }
}
