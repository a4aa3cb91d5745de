//! Runtime error types.

use swarm_core::errors::ApiError;

/// Errors from agent creation, messaging, and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Container memory usage is above the admission threshold.
    #[error("memory usage at {pct:.0}%, refusing new agents")]
    MemoryPressure {
        /// Usage percentage at rejection time.
        pct: f64,
    },

    /// Global live-agent cap reached.
    #[error("maximum live agents ({0}) reached")]
    AgentLimit(u32),

    /// Spawn-tree depth cap reached.
    #[error("maximum agent depth ({0}) reached")]
    DepthLimit(u32),

    /// Per-parent children cap reached.
    #[error("maximum children per agent ({0}) reached")]
    ChildLimit(u32),

    /// Agent ID not in the registry.
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    /// `parentId` named an agent that does not exist.
    #[error("parent agent not found: {0}")]
    ParentNotFound(String),

    /// Invalid input (prompt too long, unknown model, bad name).
    #[error("{0}")]
    Validation(String),

    /// The child process could not be spawned.
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),

    /// Filesystem error (workspace, credentials, attachments).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Map to the API error surfaced over HTTP.
    #[must_use]
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Self::MemoryPressure { pct } => ApiError::memory_pressure(*pct),
            Self::AgentLimit(max) => ApiError::agent_limit(*max),
            Self::DepthLimit(max) => ApiError::depth_limit(*max),
            Self::ChildLimit(max) => ApiError::child_limit(*max),
            Self::AgentNotFound(id) => ApiError::agent_not_found(id),
            Self::ParentNotFound(id) => {
                ApiError::invalid_params(format!("parent agent not found: {id}"))
            }
            Self::Validation(message) => ApiError::invalid_params(message.clone()),
            Self::Spawn(message) => ApiError::spawn_failed(message.clone()),
            Self::Io(error) => ApiError::internal(error.to_string()),
        }
    }
}
