//! Shared state for Axum handlers.

use std::sync::Arc;
use std::time::Instant;

use swarm_bus::MessageBus;
use swarm_guardrails::GuardrailsRegistry;
use swarm_runtime::depcache::DepCache;
use swarm_runtime::manager::AgentManager;
use swarm_runtime::memory::MemoryProbe;

use crate::shutdown::ShutdownCoordinator;

/// State accessible from every handler.
#[derive(Clone)]
pub struct AppState {
    /// Agent registry and lifecycle.
    pub manager: Arc<AgentManager>,
    /// Inter-agent message bus.
    pub bus: Arc<MessageBus>,
    /// Mutable limits.
    pub guardrails: Arc<GuardrailsRegistry>,
    /// Memory reading for `/api/health`.
    pub memory: Arc<MemoryProbe>,
    /// Dependency-cache readiness for `/api/health`.
    pub depcache: Arc<DepCache>,
    /// Shutdown coordination.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}
