//! Container memory probe used by admission control.
//!
//! Reads cgroup v2 accounting (`memory.current` / `memory.max`); when the
//! process is not in a limited cgroup it falls back to process RSS from
//! `/proc/self/status`, which has no limit and therefore never reports
//! pressure.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Fraction of the memory limit above which new agents are rejected.
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = 0.85;

/// A point-in-time memory reading, surfaced on `/api/health`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    /// Bytes currently in use.
    pub current_bytes: Option<u64>,
    /// Memory limit in bytes; `None` when unlimited or unknown.
    pub limit_bytes: Option<u64>,
    /// `current / limit` when both are known.
    pub usage_fraction: Option<f64>,
    /// Where the reading came from: `"cgroup"` or `"rss"`.
    pub source: &'static str,
}

/// Reads memory accounting for admission control.
pub struct MemoryProbe {
    cgroup_root: PathBuf,
    proc_status: PathBuf,
    threshold: f64,
}

impl MemoryProbe {
    /// A probe over the host's real cgroup and procfs paths.
    #[must_use]
    pub fn new() -> Self {
        Self::with_paths(
            PathBuf::from("/sys/fs/cgroup"),
            PathBuf::from("/proc/self/status"),
            DEFAULT_PRESSURE_THRESHOLD,
        )
    }

    /// A probe over explicit paths, for tests.
    #[must_use]
    pub fn with_paths(cgroup_root: PathBuf, proc_status: PathBuf, threshold: f64) -> Self {
        Self {
            cgroup_root,
            proc_status,
            threshold,
        }
    }

    /// The configured pressure threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Take a reading.
    #[must_use]
    pub fn status(&self) -> MemoryStatus {
        if let Some(current) = read_u64(&self.cgroup_root.join("memory.current")) {
            let limit = read_limit(&self.cgroup_root.join("memory.max"));
            let usage_fraction = limit.and_then(|limit| {
                if limit == 0 {
                    return None;
                }
                #[allow(clippy::cast_precision_loss)]
                let fraction = current as f64 / limit as f64;
                Some(fraction)
            });
            return MemoryStatus {
                current_bytes: Some(current),
                limit_bytes: limit,
                usage_fraction,
                source: "cgroup",
            };
        }

        MemoryStatus {
            current_bytes: read_rss(&self.proc_status),
            limit_bytes: None,
            usage_fraction: None,
            source: "rss",
        }
    }

    /// `Some(percent)` when usage exceeds the threshold; `None` otherwise
    /// (including when no limit is known).
    #[must_use]
    pub fn pressure(&self) -> Option<f64> {
        let status = self.status();
        let fraction = status.usage_fraction?;
        (fraction > self.threshold).then_some(fraction * 100.0)
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn read_u64(path: &Path) -> Option<u64> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// `memory.max` is either a byte count or the literal `max` (unlimited).
fn read_limit(path: &Path) -> Option<u64> {
    let raw = std::fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    if trimmed == "max" {
        None
    } else {
        trimmed.parse().ok()
    }
}

/// `VmRSS:  12345 kB` from `/proc/self/status`.
fn read_rss(path: &Path) -> Option<u64> {
    let contents = std::fs::read_to_string(path).ok()?;
    let line = contents.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb * 1024)
}
