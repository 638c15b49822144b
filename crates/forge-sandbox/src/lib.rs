//! # forge-sandbox
//!
//! The execution environment an agent's tool calls run inside.
//!
//! Every job gets its own workspace directory. All file and command access
//! goes through a [`Toolbox`] bound to exactly one workspace, and every path
//! the agent supplies is re-resolved through the containment guard on every
//! call:
//!
//! - [`guard`] resolves relative paths and rejects anything outside the root
//! - [`WorkspaceRegistry`] names, creates and binds workspaces
//! - [`Toolbox`] exposes read/write/list/current-directory/run-command
//! - [`command`] runs shell commands with a contained cwd and a timeout
//! - [`collect_artifacts`] snapshots a finished workspace
//! - [`delete_workspace`] purges one

mod artifacts;
pub mod command;
pub mod guard;
mod lifecycle;
mod registry;
mod tools;

pub use artifacts::{collect_artifacts, collect_job_artifacts, language_for};
pub use command::CommandOutput;
pub use lifecycle::{delete_workspace, DeleteOutcome};
pub use registry::{Workspace, WorkspaceRegistry};
pub use tools::{ToolCall, Toolbox, NO_FILES_FOUND};
