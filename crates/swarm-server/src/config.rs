//! Server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP server and its persistent paths.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Base path for durable state (`messages.json`, dep cache).
    pub persistent_root: PathBuf,
    /// Root directory for per-agent workspaces.
    pub workspace_root: PathBuf,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            persistent_root: PathBuf::from("/persistent"),
            workspace_root: std::env::temp_dir().join("swarm-workspaces"),
            max_body_bytes: 10 * 1024 * 1024, // 10 MB, attachments included
        }
    }
}

impl ServerConfig {
    /// Path of the message bus dump. Falls back to a temp path when the
    /// persistent root is not mounted.
    #[must_use]
    pub fn messages_path(&self) -> PathBuf {
        if self.persistent_root.is_dir() {
            self.persistent_root.join("messages.json")
        } else {
            std::env::temp_dir().join("swarm-messages.json")
        }
    }
}
