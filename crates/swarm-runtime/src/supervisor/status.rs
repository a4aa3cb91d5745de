//! Agent lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an agent, driven by supervisor signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Child spawned, no output seen yet.
    Starting,
    /// A turn is in flight.
    Running,
    /// Last turn completed; waiting for a prompt.
    Idle,
    /// Job-control stopped via `pause`.
    Paused,
    /// No child output for longer than the stall timeout. Recoverable.
    Stalled,
    /// Started from saved state after a server restart.
    Restored,
    /// Child exited non-zero or spawn-time failure. The record is kept for
    /// inspection.
    Error,
    /// Record survived a restart but the process did not.
    Disconnected,
    /// Terminal.
    Destroyed,
}

impl AgentStatus {
    /// Whether `pause` is legal from this status.
    #[must_use]
    pub fn can_pause(self) -> bool {
        matches!(self, Self::Running | Self::Idle | Self::Stalled)
    }

    /// Whether a prompt may be sent from this status.
    #[must_use]
    pub fn can_send(self) -> bool {
        !matches!(self, Self::Paused | Self::Destroyed | Self::Error | Self::Disconnected)
    }

    /// Whether the agent still counts against the live-agent cap.
    #[must_use]
    pub fn is_live(self) -> bool {
        self != Self::Destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&AgentStatus::Starting).unwrap(), "\"starting\"");
        assert_eq!(serde_json::to_string(&AgentStatus::Destroyed).unwrap(), "\"destroyed\"");
    }

    #[test]
    fn pause_allowed_from_running_idle_stalled() {
        assert!(AgentStatus::Running.can_pause());
        assert!(AgentStatus::Idle.can_pause());
        assert!(AgentStatus::Stalled.can_pause());
        assert!(!AgentStatus::Paused.can_pause());
        assert!(!AgentStatus::Starting.can_pause());
        assert!(!AgentStatus::Destroyed.can_pause());
    }

    #[test]
    fn send_blocked_from_terminal_states() {
        assert!(AgentStatus::Starting.can_send());
        assert!(AgentStatus::Running.can_send());
        assert!(AgentStatus::Idle.can_send());
        assert!(AgentStatus::Stalled.can_send());
        assert!(!AgentStatus::Paused.can_send());
        assert!(!AgentStatus::Error.can_send());
        assert!(!AgentStatus::Destroyed.can_send());
    }

    #[test]
    fn only_destroyed_is_not_live() {
        assert!(AgentStatus::Error.is_live());
        assert!(AgentStatus::Paused.is_live());
        assert!(!AgentStatus::Destroyed.is_live());
    }
}
