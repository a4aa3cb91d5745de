//! Per-agent child-process supervision.

mod process;
mod protocol;
mod status;

pub use process::{Supervisor, SupervisorConfig};
pub use protocol::ChildRequest;
pub use status::AgentStatus;
