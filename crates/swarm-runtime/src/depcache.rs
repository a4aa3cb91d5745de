//! Dependency-cache initialization and startup readiness.
//!
//! Agents share a warm dependency cache directory under the persistent
//! volume when one is mounted, falling back to a temp path otherwise. The
//! server reports readiness on `/api/health` and holds agent creation until
//! initialization has finished.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

/// Dep-cache state, surfaced on `/api/health`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepCacheStatus {
    /// Whether initialization completed.
    pub ready: bool,
    /// Cache directory in use.
    pub base_dir: String,
    /// Whether the cache lives on the persistent volume.
    pub persistent: bool,
    /// When initialization completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized_at: Option<DateTime<Utc>>,
}

/// Shared dependency cache with a readiness signal.
pub struct DepCache {
    status: Mutex<DepCacheStatus>,
    ready_tx: watch::Sender<bool>,
    base_dir: PathBuf,
}

impl DepCache {
    /// Initialize the cache directory. Prefers `<persistent_root>/dep-cache`
    /// when the persistent root exists; otherwise uses a path under the
    /// system temp directory. Directory creation failure leaves the cache
    /// not ready; agent creation proceeds anyway (the cache is an
    /// optimization, not a dependency).
    #[must_use]
    pub fn init(persistent_root: &Path) -> Self {
        let persistent = persistent_root.is_dir();
        let base_dir = if persistent {
            persistent_root.join("dep-cache")
        } else {
            std::env::temp_dir().join("swarm-dep-cache")
        };

        let (ready_tx, _) = watch::channel(false);
        let cache = Self {
            status: Mutex::new(DepCacheStatus {
                ready: false,
                base_dir: base_dir.display().to_string(),
                persistent,
                initialized_at: None,
            }),
            ready_tx,
            base_dir,
        };

        match std::fs::create_dir_all(&cache.base_dir) {
            Ok(()) => {
                let mut status = cache.status.lock();
                status.ready = true;
                status.initialized_at = Some(Utc::now());
                drop(status);
                let _ = cache.ready_tx.send(true);
                info!(dir = %cache.base_dir.display(), persistent, "dependency cache ready");
            }
            Err(error) => {
                warn!(dir = %cache.base_dir.display(), %error, "dependency cache init failed");
            }
        }
        cache
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> DepCacheStatus {
        self.status.lock().clone()
    }

    /// Whether initialization completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready_tx.borrow()
    }

    /// A receiver that observes the readiness flag.
    #[must_use]
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready_tx.subscribe()
    }

    /// The cache directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_under_persistent_root() {
        let root = tempfile::tempdir().unwrap();
        let cache = DepCache::init(root.path());
        let status = cache.status();
        assert!(status.ready);
        assert!(status.persistent);
        assert!(status.initialized_at.is_some());
        assert!(cache.base_dir().ends_with("dep-cache"));
        assert!(cache.base_dir().is_dir());
    }

    #[test]
    fn missing_persistent_root_falls_back_to_temp() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("not-mounted");
        let cache = DepCache::init(&missing);
        let status = cache.status();
        assert!(!status.persistent);
        assert!(status.ready, "temp fallback should still initialize");
    }

    #[tokio::test]
    async fn readiness_signal_observes_ready() {
        let root = tempfile::tempdir().unwrap();
        let cache = DepCache::init(root.path());
        let rx = cache.ready_signal();
        assert!(*rx.borrow());
        assert!(cache.is_ready());
    }

    #[test]
    fn status_serializes_camel_case() {
        let root = tempfile::tempdir().unwrap();
        let cache = DepCache::init(root.path());
        let json = serde_json::to_value(cache.status()).unwrap();
        assert!(json.get("baseDir").is_some());
        assert!(json.get("initializedAt").is_some());
    }
}
