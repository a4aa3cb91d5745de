//! `/api/health`.

use serde::Serialize;

use swarm_runtime::depcache::DepCacheStatus;
use swarm_runtime::memory::MemoryStatus;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Number of live agents.
    pub agents: usize,
    /// Container memory reading.
    pub memory: MemoryStatus,
    /// Dependency-cache readiness.
    pub dep_cache: DepCacheStatus,
}

/// Build a health response from live readings.
#[must_use]
pub fn health_check(
    start_time: std::time::Instant,
    agents: usize,
    memory: MemoryStatus,
    dep_cache: DepCacheStatus,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        agents,
        memory,
        dep_cache,
    }
}
