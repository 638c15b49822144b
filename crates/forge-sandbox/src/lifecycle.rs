//! Workspace removal

use forge_core::Result;
use tracing::info;

use crate::registry::WorkspaceRegistry;

/// What a deletion found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The workspace existed and was removed
    Removed,
    /// There was nothing to remove
    AlreadyAbsent,
}

/// Remove job `id`'s workspace and everything in it.
///
/// Idempotent: a workspace that never existed, or was already deleted, is
/// reported as `AlreadyAbsent` rather than as an error. Only a failing
/// removal is an error.
pub fn delete_workspace(registry: &WorkspaceRegistry, id: &str) -> Result<DeleteOutcome> {
    let path = registry.workspace_path(id)?;

    if path.is_dir() {
        std::fs::remove_dir_all(&path)?;
        info!("Deleted workspace {} at {}", id, path.display());
        Ok(DeleteOutcome::Removed)
    } else {
        info!("Workspace {} not found, nothing to delete", id);
        Ok(DeleteOutcome::AlreadyAbsent)
    }
}
