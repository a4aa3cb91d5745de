//! Human-readable agent names derived from the first prompt.
//!
//! The name is a pure function of `(prompt, id)` so retries and restarts
//! produce the same name for the same agent.

use crate::ids::AgentId;

/// Tokens never used in a generated name.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "onto", "over", "under", "your",
    "our", "are", "was", "were", "will", "would", "should", "could", "can", "has", "have", "had",
    "not", "but", "all", "any", "you", "please",
];

/// Maximum length of the word portion of a name; the 6-hex suffix plus its
/// separator brings the total to 40.
const MAX_WORDS_LEN: usize = 33;

/// Derive a slug-style agent name from the first line of a prompt.
///
/// The first newline-delimited line is split on whitespace and every
/// non-alphanumeric character (dots and slashes separate words, they do not
/// split the line), lowercased, and filtered: tokens shorter than three
/// characters and stop words are dropped. The first three survivors are
/// joined with `-` and suffixed with the first six hex characters of the
/// agent ID. With no surviving tokens the name falls back to
/// `agent-<first 8 hex of id>`.
///
/// The output alphabet is `[a-z0-9-]`.
#[must_use]
pub fn generate_name_from_prompt(prompt: &str, id: &AgentId) -> String {
    let first_line = prompt.lines().next().unwrap_or("");

    let words: Vec<String> = first_line
        .split(|c: char| !c.is_ascii_alphanumeric())
        .map(str::to_ascii_lowercase)
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .take(3)
        .collect();

    if words.is_empty() {
        return format!("agent-{}", id.hex_prefix(8));
    }

    let mut joined = words.join("-");
    if joined.len() > MAX_WORDS_LEN {
        joined.truncate(MAX_WORDS_LEN);
        while joined.ends_with('-') {
            let _ = joined.pop();
        }
    }

    format!("{joined}-{}", id.hex_prefix(6))
}
