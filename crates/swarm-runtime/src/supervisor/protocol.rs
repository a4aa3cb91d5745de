//! Stdin protocol with the child CLI.
//!
//! The child reads one JSON request per line. Replies arrive on stdout as
//! newline-delimited JSON events (see `swarm-events`).

use serde::{Deserialize, Serialize};

/// A request written to the child's stdin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChildRequest {
    /// Start a new turn. Sending this while a turn is running interrupts
    /// the current task first.
    Prompt {
        /// Prompt text.
        prompt: String,
        /// Turn cap for this prompt.
        #[serde(skip_serializing_if = "Option::is_none")]
        max_turns: Option<u32>,
        /// Child CLI session to resume.
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// Cancel the in-flight turn.
    Interrupt,
}

impl ChildRequest {
    /// Serialize to one newline-terminated wire line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_wire_format() {
        let request = ChildRequest::Prompt {
            prompt: "list files".into(),
            max_turns: Some(10),
            session_id: None,
        };
        let line = request.to_line().unwrap();
        assert!(line.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["type"], "prompt");
        assert_eq!(value["prompt"], "list files");
        assert_eq!(value["max_turns"], 10);
        assert!(value.get("session_id").is_none());
    }

    #[test]
    fn interrupt_wire_format() {
        let line = ChildRequest::Interrupt.to_line().unwrap();
        assert_eq!(line, "{\"type\":\"interrupt\"}\n");
    }

    #[test]
    fn roundtrip() {
        let request = ChildRequest::Prompt {
            prompt: "p".into(),
            max_turns: None,
            session_id: Some("cli-1".into()),
        };
        let line = request.to_line().unwrap();
        let back: ChildRequest = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(back, request);
    }
}
