//! Artifact collection
//!
//! Snapshots every regular file in a workspace once a job has finished.
//! Files that are not valid UTF-8 are skipped with a warning; one bad file
//! never fails the whole collection.

use forge_core::{Artifact, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::registry::WorkspaceRegistry;

/// Extension to content type; anything else is `text`
const LANGUAGES: &[(&str, &str)] = &[
    ("html", "html"),
    ("css", "css"),
    ("js", "javascript"),
    ("py", "python"),
    ("json", "json"),
    ("md", "markdown"),
    ("txt", "text"),
];

const DEFAULT_LANGUAGE: &str = "text";

/// Classify a file by its (case-insensitive) extension
pub fn language_for(path: &Path) -> &'static str {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return DEFAULT_LANGUAGE,
    };

    LANGUAGES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, language)| *language)
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Collect every file under `root` in directory-walk order.
///
/// A missing root yields an empty list. Symlinks are not followed.
pub fn collect_artifacts(root: &Path) -> Vec<Artifact> {
    let mut artifacts = Vec::new();

    if !root.is_dir() {
        debug!("No workspace at {}, nothing to collect", root.display());
        return artifacts;
    }

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Error reading file {}: {}", path.display(), e);
                continue;
            }
        };

        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };

        artifacts.push(Artifact {
            filepath: relative.to_string_lossy().to_string(),
            content,
            language: language_for(path).to_string(),
        });
    }

    debug!("Collected {} artifacts from {}", artifacts.len(), root.display());
    artifacts
}

/// Collect the artifacts of job `id`
pub fn collect_job_artifacts(registry: &WorkspaceRegistry, id: &str) -> Result<Vec<Artifact>> {
    let path = registry.workspace_path(id)?;
    Ok(collect_artifacts(&path))
}
