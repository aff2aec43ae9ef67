//! Execution topology selection

use serde::Deserialize;

/// Configured topology preference
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopologyMode {
    /// Pick from available parallelism
    #[default]
    Auto,
    /// Always run producer and consumer inline
    Inline,
    /// Always run producer and consumer as separate tasks
    Concurrent,
}

/// How the feed and the aggregator are driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// One context: each trade is queued and ingested before the next is read
    Inline,
    /// A feed task and an aggregation task joined by the ingestion queue
    Concurrent,
}

impl Topology {
    /// `Inline` when fewer than `threshold` execution contexts are available
    pub fn select(available: usize, threshold: usize) -> Self {
        if available < threshold {
            Topology::Inline
        } else {
            Topology::Concurrent
        }
    }

    /// Resolve a configured mode against this machine
    pub fn resolve(mode: TopologyMode, threshold: usize) -> Self {
        match mode {
            TopologyMode::Auto => Self::select(available_parallelism(), threshold),
            TopologyMode::Inline => Topology::Inline,
            TopologyMode::Concurrent => Topology::Concurrent,
        }
    }
}

/// Execution contexts available to this process (at least 1)
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_by_parallelism() {
        assert_eq!(Topology::select(1, 2), Topology::Inline);
        assert_eq!(Topology::select(2, 2), Topology::Concurrent);
        assert_eq!(Topology::select(16, 2), Topology::Concurrent);
        assert_eq!(Topology::select(4, 8), Topology::Inline);
    }

    #[test]
    fn test_resolve_forced_modes() {
        assert_eq!(
            Topology::resolve(TopologyMode::Inline, 1),
            Topology::Inline
        );
        assert_eq!(
            Topology::resolve(TopologyMode::Concurrent, usize::MAX),
            Topology::Concurrent
        );
    }

    #[test]
    fn test_resolve_auto() {
        assert_eq!(
            Topology::resolve(TopologyMode::Auto, usize::MAX),
            Topology::Inline
        );
        assert_eq!(
            Topology::resolve(TopologyMode::Auto, 1),
            Topology::Concurrent
        );
    }

    #[test]
    fn test_available_parallelism_is_positive() {
        assert!(available_parallelism() >= 1);
    }
}
