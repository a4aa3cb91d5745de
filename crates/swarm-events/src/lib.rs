//! # swarm-events
//!
//! The event pipeline for one agent: a tagged event model, a bounded
//! append-only log with stable absolute indices, and a fan-out hub that
//! replays the retained tail to new subscribers before switching them to
//! live delivery.
//!
//! Every event passes through the sanitizer before it is appended or
//! delivered; an event that cannot be sanitized is dropped and replaced by
//! a synthetic error event.

#![deny(unsafe_code)]

mod event;
mod hub;
mod log;

pub use event::{AgentEvent, EventKind};
pub use hub::{FanoutHub, Subscription};
pub use log::{DEFAULT_RETAINED_EVENTS, EventLog, EventRecord};
