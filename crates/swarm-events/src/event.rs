//! Agent event model.
//!
//! An event is one parsed record emitted by a child process, or emitted
//! synthetically by the supervisor. The `type` discriminator selects
//! semantics; all other fields ride along untouched, so tool calls, token
//! counts, and session IDs survive the pipeline without a schema change
//! here.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Event discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Child or supervisor housekeeping (init, watchdog, errors).
    System,
    /// The prompt that started a turn.
    UserPrompt,
    /// Assistant output from the child CLI.
    Assistant,
    /// User-role record echoed by the child CLI.
    User,
    /// Turn completed; carries token usage.
    Result,
    /// A line the child wrote to stderr.
    Stderr,
    /// Terminal marker for a finished stream segment.
    Done,
    /// The agent was destroyed; final event on every stream.
    Destroyed,
    /// A stdout line that did not parse as JSON.
    Raw,
    /// Forward-compatible catch-all for unknown child event types.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// The wire string for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::UserPrompt => "user_prompt",
            Self::Assistant => "assistant",
            Self::User => "user",
            Self::Result => "result",
            Self::Stderr => "stderr",
            Self::Done => "done",
            Self::Destroyed => "destroyed",
            Self::Raw => "raw",
            Self::Other => "other",
        }
    }
}

/// One event in an agent's stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    /// Discriminator.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// All remaining fields of the record.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl AgentEvent {
    /// An event with no extra fields.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            fields: Map::new(),
        }
    }

    /// An event with the given extra fields.
    #[must_use]
    pub fn with_fields(kind: EventKind, fields: Map<String, Value>) -> Self {
        Self { kind, fields }
    }

    /// Wrap a stderr line.
    #[must_use]
    pub fn stderr(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("text".into(), Value::String(text.into()));
        Self::with_fields(EventKind::Stderr, fields)
    }

    /// Wrap a stdout line that failed to parse as JSON.
    #[must_use]
    pub fn raw(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("text".into(), Value::String(text.into()));
        Self::with_fields(EventKind::Raw, fields)
    }

    /// A supervisor-generated system event.
    #[must_use]
    pub fn system(subtype: &str, message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("subtype".into(), Value::String(subtype.to_owned()));
        let _ = fields.insert("message".into(), Value::String(message.into()));
        let _ = fields.insert(
            "timestamp".into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        Self::with_fields(EventKind::System, fields)
    }

    /// The terminal `destroyed` event.
    #[must_use]
    pub fn destroyed() -> Self {
        let mut fields = Map::new();
        let _ = fields.insert(
            "timestamp".into(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        Self::with_fields(EventKind::Destroyed, fields)
    }

    /// A `done` event, optionally carrying the child's exit code.
    #[must_use]
    pub fn done(exit_code: Option<i32>) -> Self {
        let mut fields = Map::new();
        if let Some(code) = exit_code {
            let _ = fields.insert("exitCode".into(), json!(code));
        }
        Self::with_fields(EventKind::Done, fields)
    }

    /// A string field by name, if present.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// A numeric field by name, if present.
    #[must_use]
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }

    /// Parse one newline-delimited JSON line from the child. A line that is
    /// not a JSON object with a `type` field becomes a `raw` event rather
    /// than being dropped.
    #[must_use]
    pub fn parse_line(line: &str) -> Self {
        match serde_json::from_str::<Self>(line) {
            Ok(event) => event,
            Err(_) => Self::raw(line),
        }
    }

    /// The event as a JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Rebuild an event from a JSON value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
