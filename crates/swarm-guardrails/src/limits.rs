//! Bounded orchestrator limits.

use serde::{Deserialize, Serialize};

/// A limit update outside its documented range.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{field} must be between {min} and {max}, got {value}")]
pub struct GuardrailError {
    /// Offending field name (camelCase, as on the wire).
    pub field: &'static str,
    /// Lower bound, inclusive.
    pub min: u64,
    /// Upper bound, inclusive.
    pub max: u64,
    /// The rejected value.
    pub value: u64,
}

macro_rules! check_range {
    ($field:literal, $value:expr, $min:literal, $max:literal) => {
        if !($min..=$max).contains(&$value) {
            return Err(GuardrailError {
                field: $field,
                min: u64::from($min),
                max: u64::from($max),
                value: u64::from($value),
            });
        }
    };
}

/// Orchestrator limits, read live by every admission check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    /// Maximum prompt length in bytes. Range [1,000; 1,000,000].
    pub max_prompt_length: u32,
    /// Maximum turns per prompt. Range [1; 10,000].
    pub max_turns: u32,
    /// Maximum live agents. Range [1; 100].
    pub max_agents: u32,
    /// Maximum agents per batch-create request. Range [1; 50].
    pub max_batch_size: u32,
    /// Maximum spawn-tree depth. Range [1; 10].
    pub max_agent_depth: u32,
    /// Maximum children per parent agent. Range [1; 20].
    pub max_children_per_agent: u32,
    /// Idle TTL before an agent is destroyed, in milliseconds.
    /// Range [60,000; 86,400,000].
    pub session_ttl_ms: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_prompt_length: 100_000,
            max_turns: 500,
            max_agents: 100,
            max_batch_size: 10,
            max_agent_depth: 3,
            max_children_per_agent: 20,
            session_ttl_ms: 14_400_000,
        }
    }
}

impl Limits {
    /// Validate every field against its documented range.
    pub fn validate(&self) -> Result<(), GuardrailError> {
        check_range!("maxPromptLength", self.max_prompt_length, 1_000u32, 1_000_000u32);
        check_range!("maxTurns", self.max_turns, 1u32, 10_000u32);
        check_range!("maxAgents", self.max_agents, 1u32, 100u32);
        check_range!("maxBatchSize", self.max_batch_size, 1u32, 50u32);
        check_range!("maxAgentDepth", self.max_agent_depth, 1u32, 10u32);
        check_range!("maxChildrenPerAgent", self.max_children_per_agent, 1u32, 20u32);
        check_range!("sessionTtlMs", self.session_ttl_ms, 60_000u64, 86_400_000u64);
        Ok(())
    }

    /// Apply a partial update, returning the merged limits if valid.
    pub fn merged(&self, update: &LimitsUpdate) -> Result<Self, GuardrailError> {
        let merged = Self {
            max_prompt_length: update.max_prompt_length.unwrap_or(self.max_prompt_length),
            max_turns: update.max_turns.unwrap_or(self.max_turns),
            max_agents: update.max_agents.unwrap_or(self.max_agents),
            max_batch_size: update.max_batch_size.unwrap_or(self.max_batch_size),
            max_agent_depth: update.max_agent_depth.unwrap_or(self.max_agent_depth),
            max_children_per_agent: update
                .max_children_per_agent
                .unwrap_or(self.max_children_per_agent),
            session_ttl_ms: update.session_ttl_ms.unwrap_or(self.session_ttl_ms),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial limits update, as accepted by the admin API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LimitsUpdate {
    /// New prompt-length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_prompt_length: Option<u32>,
    /// New per-prompt turn cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    /// New live-agent cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_agents: Option<u32>,
    /// New batch-size cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<u32>,
    /// New spawn-depth cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_agent_depth: Option<u32>,
    /// New children-per-parent cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_children_per_agent: Option<u32>,
    /// New idle TTL in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let limits = Limits::default();
        assert!(limits.validate().is_ok());
        assert_eq!(limits.max_prompt_length, 100_000);
        assert_eq!(limits.max_turns, 500);
        assert_eq!(limits.max_agents, 100);
        assert_eq!(limits.max_batch_size, 10);
        assert_eq!(limits.max_agent_depth, 3);
        assert_eq!(limits.max_children_per_agent, 20);
        assert_eq!(limits.session_ttl_ms, 14_400_000);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut limits = Limits::default();
        limits.max_agents = 0;
        let err = limits.validate().unwrap_err();
        assert_eq!(err.field, "maxAgents");
        assert_eq!(err.min, 1);
        assert_eq!(err.max, 100);
    }

    #[test]
    fn boundary_values_accepted() {
        let mut limits = Limits::default();
        limits.max_agents = 100;
        limits.max_agent_depth = 10;
        limits.session_ttl_ms = 60_000;
        assert!(limits.validate().is_ok());
    }

    #[test]
    fn ttl_below_minute_rejected() {
        let mut limits = Limits::default();
        limits.session_ttl_ms = 59_999;
        let err = limits.validate().unwrap_err();
        assert_eq!(err.field, "sessionTtlMs");
    }

    #[test]
    fn prompt_length_above_cap_rejected() {
        let mut limits = Limits::default();
        limits.max_prompt_length = 1_000_001;
        assert!(limits.validate().is_err());
    }

    #[test]
    fn merged_applies_only_given_fields() {
        let base = Limits::default();
        let update = LimitsUpdate {
            max_agents: Some(5),
            ..LimitsUpdate::default()
        };
        let merged = base.merged(&update).unwrap();
        assert_eq!(merged.max_agents, 5);
        assert_eq!(merged.max_turns, base.max_turns);
    }

    #[test]
    fn merged_rejects_invalid_update() {
        let base = Limits::default();
        let update = LimitsUpdate {
            max_batch_size: Some(51),
            ..LimitsUpdate::default()
        };
        assert!(base.merged(&update).is_err());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(Limits::default()).unwrap();
        assert!(json.get("maxPromptLength").is_some());
        assert!(json.get("sessionTtlMs").is_some());
        assert!(json.get("max_prompt_length").is_none());
    }

    #[test]
    fn update_rejects_unknown_fields() {
        let result: Result<LimitsUpdate, _> =
            serde_json::from_str(r#"{"maxAgents": 5, "bogus": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn error_display_names_field_and_range() {
        let mut limits = Limits::default();
        limits.max_agent_depth = 11;
        let msg = limits.validate().unwrap_err().to_string();
        assert!(msg.contains("maxAgentDepth"));
        assert!(msg.contains("between 1 and 10"));
    }
}
