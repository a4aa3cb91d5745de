//! # swarm-bus
//!
//! Cross-agent messaging: a bounded in-memory store with direct, broadcast,
//! and role-excluded delivery, per-recipient read tracking, a listener hook
//! for higher layers, and best-effort debounced persistence to a single
//! JSON dump written atomically via temp-file-plus-rename.

#![deny(unsafe_code)]

mod bus;
mod message;

pub use bus::{BusSubscription, FLUSH_DEBOUNCE, MessageBus};
pub use message::{Message, MessageQuery, PostMessage};
