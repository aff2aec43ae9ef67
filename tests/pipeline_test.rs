//! End-to-end tests: recorded feed -> queue -> aggregator -> sink

use pair_vwap::config::Config;
use pair_vwap::dispatcher::{Dispatcher, Topology, TopologyMode};
use pair_vwap::feed::{parse_message, ReplayFeed, TradeEvent};
use pair_vwap::sink::UpdateSink;
use pair_vwap::{VwapAggregator, VwapUpdate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const PAIRS: [&str; 3] = ["BTC-USD", "ETH-USD", "ETH-BTC"];

/// Coinbase-shaped messages: round-robin matches plus noise
fn recorded_feed(count: usize, seed: u64) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut lines = vec![r#"{"type":"subscriptions","channels":[{"name":"matches"}]}"#.to_string()];

    for i in 0..count {
        let pair = PAIRS[i % PAIRS.len()];
        let price: f64 = rng.gen_range(0.0..100.0);
        let size: f64 = rng.gen_range(0.0..10.0);
        lines.push(format!(
            r#"{{"type":"match","trade_id":{},"product_id":"{}","price":"{:.2}","size":"{:.8}","time":"2024-01-01T00:00:00.000000Z","side":"buy"}}"#,
            i, pair, price, size
        ));
        if i % 17 == 0 {
            lines.push(format!(r#"{{"type":"heartbeat","product_id":"{}"}}"#, pair));
        }
        if i % 41 == 0 {
            lines.push(r#"{"type":"match","product_id":"BTC-USD","price":"n/a","size":"1"}"#.to_string());
        }
    }
    lines
}

fn write_feed(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn sequential_replay(lines: &[String], window: usize) -> VwapAggregator {
    let mut agg = VwapAggregator::new(PAIRS, window).unwrap();
    for line in lines {
        if let Ok(Some(trade)) = parse_message(line) {
            agg.ingest(&trade).unwrap();
        }
    }
    agg
}

fn config(window: usize, topology: TopologyMode) -> Config {
    let mut config = Config::default();
    config.aggregator.window_size = window;
    config.dispatcher.topology = topology;
    config
}

fn channel_sink() -> (Arc<dyn UpdateSink>, mpsc::UnboundedReceiver<VwapUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel::<VwapUpdate>();
    (Arc::new(tx), rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_replay_equals_sequential() {
    let lines = recorded_feed(900, 1);
    let file = write_feed(&lines);

    let (sink, _rx) = channel_sink();
    let dispatcher =
        Dispatcher::from_config(&config(200, TopologyMode::Concurrent), sink).unwrap();
    assert_eq!(dispatcher.topology(), Topology::Concurrent);

    let report = dispatcher
        .run(&ReplayFeed::new(file.path()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.received, 900);
    assert_eq!(report.ingested, 900);
    assert_eq!(report.rejected, 0);

    let state = dispatcher.aggregator().read().await.clone();
    assert_eq!(state, sequential_replay(&lines, 200));
}

#[tokio::test]
async fn test_inline_replay_equals_sequential() {
    let lines = recorded_feed(300, 2);
    let file = write_feed(&lines);

    let (sink, _rx) = channel_sink();
    let dispatcher = Dispatcher::from_config(&config(50, TopologyMode::Inline), sink).unwrap();
    let report = dispatcher
        .run(&ReplayFeed::new(file.path()), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.topology, Topology::Inline);
    assert_eq!(report.ingested, 300);

    let state = dispatcher.aggregator().read().await.clone();
    assert_eq!(state, sequential_replay(&lines, 50));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_updates_are_emitted_in_feed_order() {
    let lines = recorded_feed(120, 3);
    let file = write_feed(&lines);

    let (sink, mut rx) = channel_sink();
    let dispatcher =
        Dispatcher::from_config(&config(10, TopologyMode::Concurrent), sink).unwrap();
    dispatcher
        .run(&ReplayFeed::new(file.path()), CancellationToken::new())
        .await
        .unwrap();

    let trades: Vec<TradeEvent> = lines
        .iter()
        .filter_map(|line| parse_message(line).ok().flatten())
        .collect();

    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }

    assert_eq!(updates.len(), trades.len());
    for (update, trade) in updates.iter().zip(&trades) {
        assert_eq!(update.pair_id, trade.pair_id);
        assert_eq!(update.time, trade.time);
    }
}

#[tokio::test]
async fn test_per_pair_lookup_after_run() {
    let lines = vec![
        r#"{"type":"match","product_id":"BTC-USD","price":"40000","size":"0.5"}"#.to_string(),
        r#"{"type":"match","product_id":"ETH-USD","price":"2000","size":"2"}"#.to_string(),
        r#"{"type":"match","product_id":"BTC-USD","price":"42000","size":"1.5"}"#.to_string(),
    ];
    let file = write_feed(&lines);

    let (sink, _rx) = channel_sink();
    let dispatcher = Dispatcher::from_config(&config(200, TopologyMode::Inline), sink).unwrap();
    dispatcher
        .run(&ReplayFeed::new(file.path()), CancellationToken::new())
        .await
        .unwrap();

    let aggregator = dispatcher.aggregator();
    let agg = aggregator.read().await;
    assert!((agg.get_vwap("BTC-USD").unwrap() - 41_500.0).abs() < 1e-9);
    assert_eq!(agg.get_vwap("ETH-USD").unwrap(), 2000.0);
    assert!(agg.get_vwap("ETH-BTC").is_err());
}

#[tokio::test]
async fn test_replay_of_missing_file_fails() {
    let (sink, _rx) = channel_sink();
    let dispatcher = Dispatcher::from_config(&Config::default(), sink).unwrap();
    let result = dispatcher
        .run(&ReplayFeed::new("/nonexistent.jsonl"), CancellationToken::new())
        .await;
    assert!(result.is_err());
}
