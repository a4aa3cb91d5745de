//! # swarm-runtime
//!
//! The agent runtime: a per-agent process supervisor that turns an external
//! LLM CLI's stdio into an event stream, and the agent manager that owns
//! the registry, enforces admission guardrails, allocates workspaces, and
//! runs the TTL sweep.

#![deny(unsafe_code)]

pub mod depcache;
pub mod errors;
pub mod manager;
pub mod memory;
pub mod supervisor;
pub mod types;
