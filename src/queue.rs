//! Unbounded FIFO hand-off between the feed and the aggregator
//!
//! `push` never waits. `pop` waits for the next event and reports
//! `QueueClosed` once the queue is closed and fully drained. There is no
//! capacity bound: a stalled consumer lets the backlog grow, which is only
//! surfaced through the queue depth gauge.

use crate::error::VwapError;
use crate::feed::TradeEvent;
use crate::telemetry::{set_gauge, GaugeMetric};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<TradeEvent>,
    closed: bool,
}

/// Ingestion queue shared by producer and consumer
#[derive(Debug, Default)]
pub struct IngestionQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl IngestionQueue {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Every critical section is a single push, pop or flag store, so a
        // poisoned lock still guards consistent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue an event without waiting
    pub fn push(&self, event: TradeEvent) -> Result<(), VwapError> {
        let depth = {
            let mut state = self.lock();
            if state.closed {
                return Err(VwapError::QueueClosed);
            }
            state.events.push_back(event);
            state.events.len()
        };

        set_gauge(GaugeMetric::QueueDepth, depth as f64);
        self.notify.notify_one();
        Ok(())
    }

    /// Take the oldest event if one is ready
    ///
    /// `Ok(None)` means the queue is empty but still open.
    pub fn try_pop(&self) -> Result<Option<TradeEvent>, VwapError> {
        let mut state = self.lock();
        match state.events.pop_front() {
            Some(event) => {
                set_gauge(GaugeMetric::QueueDepth, state.events.len() as f64);
                Ok(Some(event))
            }
            None if state.closed => Err(VwapError::QueueClosed),
            None => Ok(None),
        }
    }

    /// Wait for the oldest event
    ///
    /// Returns `QueueClosed` once the queue has been closed and drained.
    /// Cancel-safe: dropping the future never loses an event.
    pub async fn pop(&self) -> Result<TradeEvent, VwapError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a close() between the check and
            // the await still wakes us.
            notified.as_mut().enable();

            if let Some(event) = self.try_pop()? {
                return Ok(event);
            }

            notified.await;
        }
    }

    /// Refuse further pushes; queued events remain poppable
    pub fn close(&self) {
        let was_closed = {
            let mut state = self.lock();
            std::mem::replace(&mut state.closed, true)
        };

        if !was_closed {
            tracing::debug!(pending = self.len(), "Ingestion queue closed");
        }
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }
}
