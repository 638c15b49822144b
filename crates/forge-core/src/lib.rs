//! # forge-core
//!
//! Core types for the forge code-generation server.
//!
//! A remote caller submits a prompt, an agent materialises a project inside a
//! sandboxed workspace, and progress streams back as staged status events.
//! This crate holds what every other forge crate agrees on:
//!
//! - The unified error taxonomy ([`ForgeError`])
//! - Wire types for job requests, status events and artifacts
//! - Repository-level configuration ([`ForgeConfig`])

mod config;
mod error;
mod types;

pub use config::{
    AgentSettings, ForgeConfig, JobSettings, SandboxSettings, ServerSettings, WorkspaceSettings,
    CONFIG_FILE,
};
pub use error::{ForgeError, Result};
pub use types::*;
