//! Shutdown coordination using `CancellationToken`

use tokio_util::sync::CancellationToken;

/// Cancels the dispatcher on Ctrl+C
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller that cancels when Ctrl+C is received
    ///
    /// Spawns the signal listener, so it must be called inside a runtime.
    pub fn with_ctrl_c() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, draining queued trades...");
                    token.cancel();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        controller
    }

    /// Token observed by the feed and aggregation units
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
