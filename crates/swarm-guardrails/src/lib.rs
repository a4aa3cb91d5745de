//! # swarm-guardrails
//!
//! Process-wide guardrails for the orchestrator:
//!
//! - [`Limits`]: mutable, range-validated caps (agent count, depth, batch
//!   size, prompt length, TTL) read by every admission check
//! - [`GuardrailsRegistry`]: atomic snapshot publication of those limits
//! - static safety data: blocked command patterns and the model allowlist

#![deny(unsafe_code)]

mod limits;
mod patterns;
mod registry;

pub use limits::{GuardrailError, Limits, LimitsUpdate};
pub use patterns::{
    ALLOWED_MODELS, DEFAULT_MODEL, MAX_MESSAGES, STALL_TIMEOUT, is_blocked_command, is_model_allowed,
};
pub use registry::GuardrailsRegistry;
