//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

/// Reconnect bookkeeping, reset whenever a connection is established
#[derive(Debug)]
struct Backoff {
    attempts: u32,
    delay: Duration,
    initial: Duration,
    max: Duration,
}

impl Backoff {
    fn new(config: &WsConfig) -> Self {
        Self {
            attempts: 0,
            delay: config.initial_reconnect_delay,
            initial: config.initial_reconnect_delay,
            max: config.max_reconnect_delay,
        }
    }

    /// Count a failed connection and return the attempt number
    fn record_failure(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Delay before the next attempt; doubles up to `max` for the one after
    fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(self.max);
        delay
    }

    fn reset(&mut self) {
        self.attempts = 0;
        self.delay = self.initial;
    }
}

/// Reusable WebSocket client with automatic reconnection and ping/pong handling
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return a receiver for messages
    ///
    /// Spawns a background task that owns the connection, re-subscribes and
    /// reconnects with exponential backoff, and stops when `cancel` fires
    /// or the receiver is dropped. The last message is always `Disconnected`.
    pub fn connect(&self, cancel: CancellationToken) -> mpsc::Receiver<WsMessage> {
        let (tx, rx) = mpsc::channel(1024);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, tx, cancel).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        rx
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        cancel: CancellationToken,
    ) -> Result<(), WsError> {
        let mut backoff = Backoff::new(&config);

        loop {
            match Self::connect_and_stream(&config, &tx, &cancel, &mut backoff).await {
                Ok(()) => {
                    tracing::info!("WebSocket connection closed cleanly");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    break;
                }
                Err(e) => {
                    let reconnect_attempts = backoff.record_failure();
                    tracing::warn!(
                        error = %e,
                        attempt = reconnect_attempts,
                        "WebSocket connection error, reconnecting..."
                    );

                    // Check max reconnects (0 = infinite)
                    if config.max_reconnect_attempts > 0
                        && reconnect_attempts >= config.max_reconnect_attempts
                    {
                        tracing::error!("Max reconnection attempts reached");
                        let _ = tx.send(WsMessage::Disconnected).await;
                        return Err(WsError::MaxReconnectsExceeded);
                    }

                    if tx.is_closed() || cancel.is_cancelled() {
                        tracing::info!("Feed stopped, not reconnecting");
                        let _ = tx.send(WsMessage::Disconnected).await;
                        break;
                    }

                    let _ = tx
                        .send(WsMessage::Reconnecting {
                            attempt: reconnect_attempts,
                        })
                        .await;

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            let _ = tx.send(WsMessage::Disconnected).await;
                            break;
                        }
                        _ = sleep(backoff.next_delay()) => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Connect, send the subscription, and stream text frames until close
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        cancel: &CancellationToken,
        backoff: &mut Backoff,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            res = connect_async(&config.url) => {
                res.map_err(|e| WsError::ConnectionFailed(e.to_string()))?
            }
        };

        let (mut write, mut read) = ws_stream.split();

        if let Some(ref subscribe) = config.subscribe_message {
            write
                .send(Message::Text(subscribe.clone()))
                .await
                .map_err(|e| WsError::SendFailed(e.to_string()))?;
        }

        tracing::info!("WebSocket connected");

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }
        backoff.reset();

        let mut ping_interval = tokio::time::interval(config.ping_interval);
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Received close frame");
                            return Err(WsError::ConnectionFailed("Server closed connection".into()));
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                _ = ping_interval.tick() => {
                    if waiting_for_pong {
                        return Err(WsError::ConnectionFailed("Pong timeout".into()));
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}
