//! Static safety data: message cap, stall timeout, blocked command
//! patterns, and the model allowlist.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Maximum messages retained by the message bus; overflow evicts oldest.
pub const MAX_MESSAGES: usize = 500;

/// An agent producing no output for this long is considered stalled.
pub const STALL_TIMEOUT: Duration = Duration::from_millis(600_000);

/// Models agents may be created with.
pub const ALLOWED_MODELS: &[&str] = &["sonnet", "opus", "haiku"];

/// Model used when a create request names none.
pub const DEFAULT_MODEL: &str = "sonnet";

/// Commands matching any of these are rejected by downstream validation
/// before they reach a child shell.
const BLOCKED_COMMAND_SOURCES: &[&str] = &[
    r"rm\s+(-[a-zA-Z]*\s+)*(/|~)(\s|$)",
    r"rm\s+-[a-zA-Z]*[rR][a-zA-Z]*f",
    r":\s*\(\s*\)\s*\{.*\}\s*;\s*:",
    r"mkfs(\.\w+)?\s",
    r"dd\s+.*of=/dev/",
    r">\s*/dev/sd[a-z]",
    r"chmod\s+(-[a-zA-Z]+\s+)*777\s+/(\s|$)",
    r"git\s+push\s+.*--force.*\s(main|master)(\s|$)",
    r"(shutdown|reboot|halt|poweroff)(\s|$)",
];

static BLOCKED_COMMAND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCKED_COMMAND_SOURCES
        .iter()
        .map(|source| Regex::new(source).expect("blocked command pattern must compile"))
        .collect()
});

/// Whether a command line matches a blocked pattern.
#[must_use]
pub fn is_blocked_command(command: &str) -> bool {
    BLOCKED_COMMAND_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(command))
}

/// Whether a model name is on the allowlist.
#[must_use]
pub fn is_model_allowed(model: &str) -> bool {
    ALLOWED_MODELS.contains(&model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_patterns_compile() {
        assert_eq!(BLOCKED_COMMAND_PATTERNS.len(), BLOCKED_COMMAND_SOURCES.len());
    }

    #[test]
    fn recursive_force_delete_blocked() {
        assert!(is_blocked_command("rm -rf /"));
        assert!(is_blocked_command("rm -rf ~/"));
        assert!(is_blocked_command("sudo rm -Rf /var"));
    }

    #[test]
    fn fork_bomb_blocked() {
        assert!(is_blocked_command(":(){ :|:& };:"));
    }

    #[test]
    fn disk_writes_blocked() {
        assert!(is_blocked_command("dd if=/dev/zero of=/dev/sda"));
        assert!(is_blocked_command("mkfs.ext4 /dev/sda1"));
    }

    #[test]
    fn force_push_to_main_blocked() {
        assert!(is_blocked_command("git push origin --force main"));
        assert!(!is_blocked_command("git push origin feature-branch"));
    }

    #[test]
    fn ordinary_commands_allowed() {
        assert!(!is_blocked_command("cargo test"));
        assert!(!is_blocked_command("ls -la"));
        assert!(!is_blocked_command("rm build/output.txt"));
        assert!(!is_blocked_command("grep -r TODO src/"));
    }

    #[test]
    fn model_allowlist() {
        assert!(is_model_allowed("sonnet"));
        assert!(is_model_allowed(DEFAULT_MODEL));
        assert!(!is_model_allowed("gpt-4"));
        assert!(!is_model_allowed(""));
    }

    #[test]
    fn stall_timeout_is_ten_minutes() {
        assert_eq!(STALL_TIMEOUT, Duration::from_secs(600));
    }

    #[test]
    fn message_cap() {
        assert_eq!(MAX_MESSAGES, 500);
    }
}
