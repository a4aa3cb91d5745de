//! Inter-agent message model.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use swarm_core::ids::MessageId;

/// A message on the bus.
///
/// A message without `to` is a broadcast, visible to every agent whose role
/// is not in `exclude_roles`. An excluded agent is a non-recipient for both
/// visibility and read tracking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID.
    pub id: MessageId,
    /// Sending agent ID.
    pub from: String,
    /// Sender's human-readable name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    /// Recipient agent ID; absent for broadcasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Optional channel tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Freeform message type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body.
    pub content: String,
    /// Arbitrary structured metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Assignment time; storage order and `created_at` order agree.
    pub created_at: DateTime<Utc>,
    /// Agent IDs that have marked this message read.
    #[serde(default)]
    pub read_by: BTreeSet<String>,
    /// Roles excluded from receiving this broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_roles: Option<BTreeSet<String>>,
}

impl Message {
    /// Whether `(agent_id, role)` is a recipient of this message.
    #[must_use]
    pub fn is_visible_to(&self, agent_id: &str, role: Option<&str>) -> bool {
        match &self.to {
            Some(to) => to == agent_id,
            None => !self.excludes_role(role),
        }
    }

    /// Whether the given role is excluded from this broadcast.
    #[must_use]
    pub fn excludes_role(&self, role: Option<&str>) -> bool {
        match (&self.exclude_roles, role) {
            (Some(excluded), Some(role)) => excluded.contains(role),
            _ => false,
        }
    }

    /// Whether the agent has not yet read this message.
    #[must_use]
    pub fn is_unread_by(&self, agent_id: &str) -> bool {
        !self.read_by.contains(agent_id)
    }
}

/// Input to [`crate::MessageBus::post`]; the bus assigns `id` and
/// `createdAt`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessage {
    /// Sending agent ID.
    pub from: String,
    /// Sender's human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    /// Recipient agent ID; omit to broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Optional channel tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Freeform message type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body.
    pub content: String,
    /// Arbitrary structured metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// Roles excluded from receiving this broadcast.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_roles: Option<BTreeSet<String>>,
}

/// Filters for [`crate::MessageBus::query`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    /// Recipient filter: matches direct messages to this agent and
    /// broadcasts whose `excludeRoles` does not contain `agentRole`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// The caller's role, consulted for broadcast exclusion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_role: Option<String>,
    /// Sender filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Channel filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Type-tag filter.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Only messages not yet read by this agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unread_by: Option<String>,
    /// Only messages created strictly after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    /// Maximum results; the newest `limit` matches are returned in original
    /// order. Defaults to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}
