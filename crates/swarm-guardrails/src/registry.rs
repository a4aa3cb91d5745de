//! Atomic snapshot publication of mutable limits.
//!
//! Admission checks read one snapshot per check; admin updates publish a
//! whole new snapshot. There are no per-field locks.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::limits::{GuardrailError, Limits, LimitsUpdate};

/// Shared, mutable guardrail limits.
pub struct GuardrailsRegistry {
    current: RwLock<Arc<Limits>>,
}

impl GuardrailsRegistry {
    /// Registry holding the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    /// Registry holding explicit initial limits (validated by the caller).
    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            current: RwLock::new(Arc::new(limits)),
        }
    }

    /// The current snapshot. Cheap; safe to call on every admission check.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Limits> {
        Arc::clone(&self.current.read())
    }

    /// Validate and publish a complete replacement.
    pub fn replace(&self, limits: Limits) -> Result<Arc<Limits>, GuardrailError> {
        limits.validate()?;
        let published = Arc::new(limits);
        *self.current.write() = Arc::clone(&published);
        info!("guardrail limits replaced");
        Ok(published)
    }

    /// Validate and publish a partial update merged over the current
    /// snapshot.
    pub fn update(&self, update: &LimitsUpdate) -> Result<Arc<Limits>, GuardrailError> {
        let mut guard = self.current.write();
        let merged = guard.merged(update)?;
        let published = Arc::new(merged);
        *guard = Arc::clone(&published);
        info!("guardrail limits updated");
        Ok(published)
    }
}

impl Default for GuardrailsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
