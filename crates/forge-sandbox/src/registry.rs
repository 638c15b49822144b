//! Workspace registry
//!
//! Maps job ids to workspace directories and hands out bound [`Workspace`]
//! handles. A binding is a value, not ambient state: whoever holds the handle
//! (normally one job's [`Toolbox`](crate::Toolbox)) is bound to that
//! workspace, and nothing else can observe it. Concurrent jobs each own their
//! own handle, so bindings never leak between them.

use forge_core::{validate_job_id, Result, WorkspaceSettings};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Names and creates workspace directories under a common base directory
#[derive(Debug, Clone)]
pub struct WorkspaceRegistry {
    base_dir: PathBuf,
    dir_prefix: String,
}

/// A workspace bound to the holder of this handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: Option<String>,
    root: PathBuf,
}

impl Workspace {
    /// Job id, or `None` for the default workspace
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Absolute, canonical workspace root
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl WorkspaceRegistry {
    pub fn new(base_dir: impl Into<PathBuf>, dir_prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            dir_prefix: dir_prefix.into(),
        }
    }

    pub fn from_settings(settings: &WorkspaceSettings) -> Self {
        Self::new(settings.base_dir.clone(), settings.dir_prefix.clone())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory a job's workspace lives in, whether or not it exists yet.
    ///
    /// # Errors
    ///
    /// `InvalidJobId` if the id cannot safely name a directory.
    pub fn workspace_path(&self, id: &str) -> Result<PathBuf> {
        let id = validate_job_id(id)?;
        Ok(self.base_dir.join(format!("{}_{}", self.dir_prefix, id)))
    }

    /// Directory of the default workspace used when nothing is bound
    pub fn default_path(&self) -> PathBuf {
        self.base_dir.join(&self.dir_prefix)
    }

    /// Bind a job's workspace, creating the directory (and parents) on demand.
    ///
    /// Binding an id again only re-ensures the directory exists.
    pub fn bind(&self, id: &str) -> Result<Workspace> {
        let path = self.workspace_path(id)?;
        let root = ensure_dir(&path)?;
        info!("Bound workspace {} at {}", id, root.display());

        Ok(Workspace {
            id: Some(id.to_string()),
            root,
        })
    }

    /// Bind the default workspace (standalone mode)
    pub fn bind_default(&self) -> Result<Workspace> {
        let root = ensure_dir(&self.default_path())?;
        debug!("Using default workspace at {}", root.display());

        Ok(Workspace { id: None, root })
    }

    /// Explicit initialisation: bind `id` if given, otherwise the default
    /// workspace. Either way the directory exists afterwards.
    pub fn init(&self, id: Option<&str>) -> Result<Workspace> {
        match id {
            Some(id) => self.bind(id),
            None => self.bind_default(),
        }
    }
}

fn ensure_dir(path: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(path)?;
    Ok(path.canonicalize()?)
}
