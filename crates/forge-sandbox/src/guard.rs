//! Path containment guard
//!
//! Resolves a caller-supplied path against a workspace root and rejects any
//! result that lands outside it. Resolution follows `..` and symlinks to their
//! real targets, including symlinks whose target does not exist yet, so a
//! dangling link cannot be used to create a file outside the root.
//!
//! Callers must resolve again for every I/O operation. A resolved path is only
//! valid for the operation it was computed for; a symlink swapped in between
//! two calls has to be seen by the second one.

use forge_core::{ForgeError, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// Matches the usual kernel limit on symlink chains
const MAX_SYMLINK_HOPS: usize = 40;

/// Resolve `relative` against `root`, accepting only the root itself or a
/// strict descendant of it.
///
/// An empty path and `.` both resolve to the root. Absolute paths are joined
/// the way the platform joins them (they replace the root) and are then
/// subject to the same containment check, so they are only accepted when they
/// already point inside the workspace.
///
/// # Errors
///
/// - `PathEscape` if the canonical result is outside the root
/// - `Io` if the root itself cannot be canonicalized or a symlink loop is found
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let root = root.canonicalize()?;
    let candidate = root.join(relative);

    let mut hops = 0;
    let resolved = resolve_components(&candidate, &mut hops)?;

    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        warn!(
            requested = relative,
            resolved = %resolved.display(),
            root = %root.display(),
            "Rejected path outside workspace"
        );
        Err(ForgeError::PathEscape { path: resolved })
    }
}

/// Walk `path` component by component, following every symlink encountered.
///
/// Components that do not exist yet are appended lexically; `..` pops the
/// already-resolved prefix, so it always applies to the real parent.
fn resolve_components(path: &Path, hops: &mut usize) -> Result<PathBuf> {
    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);

                let is_symlink = fs::symlink_metadata(&resolved)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false);

                if is_symlink {
                    *hops += 1;
                    if *hops > MAX_SYMLINK_HOPS {
                        return Err(ForgeError::Io(io::Error::new(
                            io::ErrorKind::Other,
                            format!("too many levels of symbolic links: {}", path.display()),
                        )));
                    }

                    let target = fs::read_link(&resolved)?;
                    resolved.pop();
                    let followed = resolved.join(target);
                    resolved = resolve_components(&followed, hops)?;
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("ws");
        fs::create_dir(&root).unwrap();
        let canonical = root.canonicalize().unwrap();
        (dir, canonical)
    }

    #[test]
    fn test_empty_and_dot_resolve_to_root() {
        let (_dir, root) = root();
        assert_eq!(resolve(&root, "").unwrap(), root);
        assert_eq!(resolve(&root, ".").unwrap(), root);
        assert_eq!(resolve(&root, "./.").unwrap(), root);
    }

    #[test]
    fn test_nested_nonexistent_path_accepted() {
        let (_dir, root) = root();
        let resolved = resolve(&root, "a/b/c/file.txt").unwrap();
        assert_eq!(resolved, root.join("a/b/c/file.txt"));
    }

    #[test]
    fn test_dotdot_inside_root_accepted() {
        let (_dir, root) = root();
        let resolved = resolve(&root, "a/../b.txt").unwrap();
        assert_eq!(resolved, root.join("b.txt"));
    }

    #[test]
    fn test_dotdot_escape_rejected() {
        let (_dir, root) = root();
        for path in ["..", "../x", "a/../../x", "a/b/../../../etc/passwd"] {
            let err = resolve(&root, path).unwrap_err();
            assert!(
                matches!(err, ForgeError::PathEscape { .. }),
                "{} should escape",
                path
            );
        }
    }

    #[test]
    fn test_sibling_with_shared_prefix_rejected() {
        let (dir, root) = root();
        fs::create_dir(dir.path().join("ws-other")).unwrap();
        let err = resolve(&root, "../ws-other/file").unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
    }

    #[test]
    fn test_absolute_path_outside_rejected() {
        let (_dir, root) = root();
        let err = resolve(&root, "/etc/passwd").unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
    }

    #[test]
    fn test_absolute_path_inside_accepted() {
        let (_dir, root) = root();
        let inside = root.join("inner.txt");
        let resolved = resolve(&root, inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved, inside);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let (dir, root) = root();
        let outside = dir.path().join("outside");
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();

        let err = resolve(&root, "link/secret.txt").unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_escape_rejected() {
        let (dir, root) = root();
        let target = dir.path().join("not-yet-created.txt");
        std::os::unix::fs::symlink(&target, root.join("dangling")).unwrap();

        let err = resolve(&root, "dangling").unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_accepted() {
        let (_dir, root) = root();
        fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("alias")).unwrap();

        let resolved = resolve(&root, "alias/file.txt").unwrap();
        assert_eq!(resolved, root.join("real/file.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_is_io_error() {
        let (_dir, root) = root();
        std::os::unix::fs::symlink(root.join("b"), root.join("a")).unwrap();
        std::os::unix::fs::symlink(root.join("a"), root.join("b")).unwrap();

        let err = resolve(&root, "a").unwrap_err();
        assert!(matches!(err, ForgeError::Io(_)));
    }
}
