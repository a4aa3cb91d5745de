//! Agent records and creation requests.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::supervisor::AgentStatus;

/// Running token totals and the cost estimate derived from them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageTotals {
    /// Input tokens consumed across all turns.
    pub tokens_in: u64,
    /// Output tokens produced across all turns.
    pub tokens_out: u64,
    /// Estimated cost in USD.
    pub estimated_cost: f64,
}

impl UsageTotals {
    /// Fold one turn's token counts into the totals.
    pub fn fold(&mut self, model: &str, tokens_in: u64, tokens_out: u64) {
        self.tokens_in += tokens_in;
        self.tokens_out += tokens_out;
        let (rate_in, rate_out) = per_million_rates(model);
        #[allow(clippy::cast_precision_loss)]
        {
            self.estimated_cost +=
                tokens_in as f64 * rate_in / 1e6 + tokens_out as f64 * rate_out / 1e6;
        }
    }
}

/// USD per million input/output tokens. Unknown models are billed at the
/// default model's rates.
fn per_million_rates(model: &str) -> (f64, f64) {
    match model {
        "opus" => (15.0, 75.0),
        "haiku" => (1.0, 5.0),
        _ => (3.0, 15.0),
    }
}

/// One agent's metadata, as stored in the registry and returned by the API.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    /// Agent UUID.
    pub id: String,
    /// Human-readable name derived from the first prompt.
    pub name: String,
    /// Spawning agent, when this agent was created by another agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Spawn-tree distance from a root agent. Immutable; assigned at
    /// creation so a destroyed parent cannot reset it.
    pub depth: u32,
    /// Freeform role string, consulted by broadcast exclusion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Capability tags.
    pub capabilities: BTreeSet<String>,
    /// Model the child CLI runs.
    pub model: String,
    /// Turn cap passed to the child CLI.
    pub max_turns: u32,
    /// Isolated workspace directory.
    pub workspace_dir: String,
    /// Lifecycle status, driven by supervisor signals.
    pub status: AgentStatus,
    /// Operator-visible description of what the agent is doing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_task: Option<String>,
    /// The child CLI's own session ID, once it reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_session_id: Option<String>,
    /// Token totals and estimated cost.
    pub usage: UsageTotals,
    /// Advanced on every interaction; drives TTL cleanup.
    pub last_activity: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Whether the child CLI runs with permission prompts disabled.
    pub dangerously_skip_permissions: bool,
}

/// A repository the agent needs push access to.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoSpec {
    /// HTTPS repository URL.
    pub url: String,
    /// Personal access token; repos without one get no credentials line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,
}

/// Request body for creating one agent.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgent {
    /// Initial prompt; also the source of the agent's name.
    pub prompt: String,
    /// Spawning agent ID.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Freeform role string.
    #[serde(default)]
    pub role: Option<String>,
    /// Capability tags.
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Model override; defaults to the allowlist default.
    #[serde(default)]
    pub model: Option<String>,
    /// Turn cap override.
    #[serde(default)]
    pub max_turns: Option<u32>,
    /// Resume an existing child CLI session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Operator-visible task description.
    #[serde(default)]
    pub current_task: Option<String>,
    /// Run the child CLI with permission prompts disabled.
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    /// Repositories to write `.git-credentials` entries for.
    #[serde(default)]
    pub repos: Vec<RepoSpec>,
}

/// Per-item outcome of a batch create.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    /// Created agent ID, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Created agent name, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Failure reason, on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_fold_accumulates() {
        let mut usage = UsageTotals::default();
        usage.fold("sonnet", 1000, 500);
        usage.fold("sonnet", 1000, 500);
        assert_eq!(usage.tokens_in, 2000);
        assert_eq!(usage.tokens_out, 1000);
        assert!(usage.estimated_cost > 0.0);
    }

    #[test]
    fn opus_costs_more_than_haiku() {
        let mut opus = UsageTotals::default();
        opus.fold("opus", 10_000, 10_000);
        let mut haiku = UsageTotals::default();
        haiku.fold("haiku", 10_000, 10_000);
        assert!(opus.estimated_cost > haiku.estimated_cost);
    }

    #[test]
    fn unknown_model_uses_default_rates() {
        let mut unknown = UsageTotals::default();
        unknown.fold("mystery", 1000, 1000);
        let mut sonnet = UsageTotals::default();
        sonnet.fold("sonnet", 1000, 1000);
        assert!((unknown.estimated_cost - sonnet.estimated_cost).abs() < f64::EPSILON);
    }

    #[test]
    fn create_agent_minimal_json() {
        let spec: CreateAgent = serde_json::from_str(r#"{"prompt":"do the thing"}"#).unwrap();
        assert_eq!(spec.prompt, "do the thing");
        assert!(spec.parent_id.is_none());
        assert!(spec.repos.is_empty());
        assert!(!spec.dangerously_skip_permissions);
    }

    #[test]
    fn create_agent_full_json() {
        let spec: CreateAgent = serde_json::from_str(
            r#"{
                "prompt": "review the billing module",
                "parentId": "p-1",
                "role": "reviewer",
                "capabilities": ["code-review"],
                "model": "opus",
                "maxTurns": 50,
                "dangerouslySkipPermissions": true,
                "repos": [{"url": "https://git.example.com/org/repo", "pat": "pat-value"}]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.parent_id.as_deref(), Some("p-1"));
        assert_eq!(spec.model.as_deref(), Some("opus"));
        assert_eq!(spec.repos.len(), 1);
        assert!(spec.dangerously_skip_permissions);
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = AgentRecord {
            id: "a-1".into(),
            name: "review-billing-module-abc123".into(),
            parent_id: None,
            depth: 0,
            role: Some("reviewer".into()),
            capabilities: BTreeSet::new(),
            model: "sonnet".into(),
            max_turns: 500,
            workspace_dir: "/tmp/ws".into(),
            status: AgentStatus::Idle,
            current_task: None,
            cli_session_id: Some("cli-1".into()),
            usage: UsageTotals::default(),
            last_activity: Utc::now(),
            created_at: Utc::now(),
            dangerously_skip_permissions: false,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json.get("lastActivity").is_some());
        assert!(json.get("cliSessionId").is_some());
        assert!(json.get("dangerouslySkipPermissions").is_some());
        assert!(json.get("parentId").is_none(), "absent options omitted");
    }
}
