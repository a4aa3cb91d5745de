//! Package-level constants.

/// Current version of the swarm orchestrator (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "swarm";
