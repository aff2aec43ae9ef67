//! Prometheus metrics

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Trades received from the feed
    EventsReceived,
    /// Trades applied to a window
    EventsIngested,
    /// Trades discarded by the aggregator or parser
    EventsRejected,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Events waiting in the ingestion queue
    QueueDepth,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::EventsReceived => "pair_vwap_events_received_total",
            CounterMetric::EventsIngested => "pair_vwap_events_ingested_total",
            CounterMetric::EventsRejected => "pair_vwap_events_rejected_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::QueueDepth => "pair_vwap_queue_depth",
        }
    }
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    ::metrics::counter!(metric.name()).increment(1);
}

/// Count a rejected trade under its error kind
pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!(CounterMetric::EventsRejected.name(), "reason" => reason).increment(1);
}

/// Count an ingested trade and publish the pair's current VWAP
pub fn record_vwap(pair_id: &str, vwap: f64) {
    ::metrics::counter!(CounterMetric::EventsIngested.name(), "pair" => pair_id.to_string())
        .increment(1);
    ::metrics::gauge!("pair_vwap_current", "pair" => pair_id.to_string()).set(vwap);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert_eq!(
            CounterMetric::EventsIngested.name(),
            "pair_vwap_events_ingested_total"
        );
        assert_eq!(GaugeMetric::QueueDepth.name(), "pair_vwap_queue_depth");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        increment_counter(CounterMetric::EventsReceived);
        record_rejection("unknown_pair");
        record_vwap("BTC-USD", 42.0);
        set_gauge(GaugeMetric::QueueDepth, 3.0);
    }
}
