//! Configuration types for pair-vwap

use crate::aggregator::DEFAULT_WINDOW_SIZE;
use crate::dispatcher::TopologyMode;
use crate::error::VwapError;
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::collections::HashSet;

/// Root configuration structure
///
/// Every section has defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Sliding window configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Trades retained per pair
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Pairs to subscribe to and aggregate
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}
fn default_pairs() -> Vec<String> {
    vec![
        "BTC-USD".to_string(),
        "ETH-USD".to_string(),
        "ETH-BTC".to_string(),
    ]
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            pairs: default_pairs(),
        }
    }
}

/// Producer/consumer topology configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatcherConfig {
    /// Minimum available parallelism for the two-task topology
    #[serde(default = "default_parallelism_threshold")]
    pub parallelism_threshold: usize,

    /// Force a topology instead of detecting it
    #[serde(default)]
    pub topology: TopologyMode,
}

fn default_parallelism_threshold() -> usize {
    2
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            parallelism_threshold: default_parallelism_threshold(),
            topology: TopologyMode::Auto,
        }
    }
}

/// Coinbase WebSocket feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Channel to subscribe to ("matches" or "full")
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Reconnection attempts before giving up (0 = infinite)
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,

    /// Keepalive ping interval (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_feed_url() -> String {
    "wss://ws-feed.exchange.coinbase.com".to_string()
}
fn default_channel() -> String {
    "matches".to_string()
}
fn default_max_reconnects() -> u32 {
    0
}
fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            channel: default_channel(),
            max_reconnects: default_max_reconnects(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Port for the Prometheus exporter; disabled when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the aggregator and dispatcher cannot run with
    pub fn validate(&self) -> Result<(), VwapError> {
        if self.aggregator.window_size == 0 {
            return Err(VwapError::InvalidConfig(
                "aggregator.window_size must be at least 1".to_string(),
            ));
        }

        if self.aggregator.pairs.is_empty() {
            return Err(VwapError::InvalidConfig(
                "aggregator.pairs must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for pair in &self.aggregator.pairs {
            if !seen.insert(pair.as_str()) {
                return Err(VwapError::InvalidConfig(format!(
                    "aggregator.pairs contains {} twice",
                    pair
                )));
            }
        }

        if self.dispatcher.parallelism_threshold == 0 {
            return Err(VwapError::InvalidConfig(
                "dispatcher.parallelism_threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
