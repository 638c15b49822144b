//! Unified error types for forge

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for all forge operations
#[derive(Error, Debug)]
pub enum ForgeError {
    // Tool surface contract violations
    #[error("Path escapes workspace root: {}", .path.display())]
    PathEscape { path: PathBuf },

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    // Command sandbox
    #[error("Command timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    // Agent errors
    #[error("Agent failed: {0}")]
    AgentFailure(String),

    // Workspace naming
    #[error("Invalid job id: {0:?}")]
    InvalidJobId(String),

    // Configuration
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ForgeError {
    /// Errors caused by the caller of the tool surface rather than the environment.
    ///
    /// These are raised straight back to the agent so it can adapt; they are
    /// never converted into empty results.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            ForgeError::PathEscape { .. } | ForgeError::NotADirectory(_)
        )
    }
}

/// Result type alias using ForgeError
pub type Result<T> = std::result::Result<T, ForgeError>;
