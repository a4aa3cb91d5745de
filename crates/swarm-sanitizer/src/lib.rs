//! # swarm-sanitizer
//!
//! Credential redaction for the event pipeline. Every event is passed
//! through [`Sanitizer::sanitize`] before it enters an event log or reaches
//! any subscriber, so secrets present in the process environment can never
//! leak into logs or SSE streams.
//!
//! Redaction is deterministic and never mutates its input: the sanitizer
//! returns a deep-copied value with every matching string leaf rewritten.

#![deny(unsafe_code)]

mod sanitize;
mod secrets;

pub use sanitize::{REDACTED, SanitizeError, Sanitizer};
pub use secrets::{MIN_SECRET_LEN, SecretSet};
