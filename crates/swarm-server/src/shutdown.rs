//! Graceful shutdown coordination.
//!
//! On shutdown: stop accepting connections (the cancellation token feeds
//! axum's graceful shutdown), destroy every agent (SIGTERM with a SIGKILL
//! escalation happens in the supervisors), then flush the message bus.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use swarm_bus::MessageBus;
use swarm_runtime::manager::AgentManager;

/// Overall cap on the drain phase before giving up.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Coordinates shutdown across the server, agents, and the bus.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A fresh coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A clone of the cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been initiated.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run the full drain: destroy agents, flush the bus. Called once,
    /// after `shutdown()`.
    pub async fn drain(&self, manager: &Arc<AgentManager>, bus: &Arc<MessageBus>) {
        self.shutdown();
        info!(agents = manager.live_count(), "draining before exit");

        let drain = async {
            manager.shutdown_all().await;
            if let Err(error) = bus.flush_now().await {
                warn!(%error, "final message flush failed");
            }
            bus.shutdown();
        };
        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
            warn!("drain timed out, exiting anyway");
        } else {
            info!("drain complete");
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_not_shutting_down() {
        let coordinator = ShutdownCoordinator::new();
        assert!(!coordinator.is_shutting_down());
    }

    #[test]
    fn shutdown_sets_flag_and_cancels_tokens() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[test]
    fn shutdown_is_idempotent() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.shutdown();
        coordinator.shutdown();
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn token_future_resolves_on_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        let handle = tokio::spawn(async move {
            token.cancelled().await;
            true
        });
        coordinator.shutdown();
        assert!(handle.await.unwrap());
    }
}
