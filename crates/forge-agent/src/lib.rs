//! # forge-agent
//!
//! The agent side of a forge job.
//!
//! forge does not decide what an agent thinks. It defines the [`Agent`] seam
//! a job is handed to, together with the bound [`Toolbox`](forge_sandbox::Toolbox)
//! that is the agent's only way to touch disk. Two implementations ship:
//!
//! - [`ScaffoldAgent`]: offline, writes a small static web project
//! - [`ProcessAgent`]: bridges to an external program speaking JSON lines

mod agent;
mod process;
mod scaffold;

pub use agent::{Agent, AgentTask, StepBudget};
pub use process::ProcessAgent;
pub use scaffold::ScaffoldAgent;
