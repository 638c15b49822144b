//! Tool execution surface
//!
//! The only operations an agent can perform on disk. A [`Toolbox`] is bound to
//! one workspace for its whole life; every call resolves its path through the
//! guard from scratch before touching the filesystem.
//!
//! File content is UTF-8 text. Binary files are out of scope.

use forge_core::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::command::{self, CommandOutput};
use crate::guard;
use crate::registry::{Workspace, WorkspaceRegistry};

/// Listing rendered when a directory holds no files
pub const NO_FILES_FOUND: &str = "No files found.";

/// A tool call as submitted by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolCall {
    WriteFile {
        path: String,
        content: String,
    },
    ReadFile {
        path: String,
    },
    ListFiles {
        #[serde(default = "default_directory")]
        directory: String,
    },
    GetCurrentDirectory,
    RunCmd {
        cmd: String,
        #[serde(default)]
        cwd: Option<String>,
        /// Seconds; the toolbox default applies when absent
        #[serde(default)]
        timeout: Option<u64>,
    },
}

fn default_directory() -> String {
    ".".to_string()
}

/// Run filesystem work that blocks on a blocking-pool thread
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ForgeError::Io(io::Error::new(ErrorKind::Other, e)))?
}

impl ToolCall {
    /// Tool name as seen on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::WriteFile { .. } => "write_file",
            ToolCall::ReadFile { .. } => "read_file",
            ToolCall::ListFiles { .. } => "list_files",
            ToolCall::GetCurrentDirectory => "get_current_directory",
            ToolCall::RunCmd { .. } => "run_cmd",
        }
    }
}

/// File and command operations bound to a single workspace
#[derive(Debug, Clone)]
pub struct Toolbox {
    workspace: Workspace,
    command_timeout: Duration,
}

impl Toolbox {
    pub fn new(workspace: Workspace, command_timeout: Duration) -> Self {
        Self {
            workspace,
            command_timeout,
        }
    }

    /// Toolbox on the registry's default workspace, for runs with no job id
    pub fn standalone(registry: &WorkspaceRegistry, command_timeout: Duration) -> Result<Self> {
        Ok(Self::new(registry.bind_default()?, command_timeout))
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Absolute path of the bound workspace root
    pub fn current_directory(&self) -> &Path {
        self.workspace.root()
    }

    async fn resolve(&self, path: &str) -> Result<PathBuf> {
        let root = self.workspace.root().to_path_buf();
        let path = path.to_string();
        blocking(move || guard::resolve(&root, &path)).await
    }

    /// Write `content` to `path`, creating parent directories and replacing
    /// any existing file. Returns the absolute path written.
    pub async fn write_file(&self, path: &str, content: &str) -> Result<PathBuf> {
        let target = self.resolve(path).await?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content).await?;

        info!("Wrote {} ({} bytes)", target.display(), content.len());
        Ok(target)
    }

    /// Full text of `path`, or an empty string if it does not exist
    pub async fn read_file(&self, path: &str) -> Result<String> {
        let target = self.resolve(path).await?;

        match tokio::fs::read_to_string(&target).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Read of missing file {}", target.display());
                Ok(String::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every regular file below `directory`, relative to the workspace root
    /// and sorted. An empty vector means no files.
    ///
    /// # Errors
    ///
    /// `NotADirectory` if `directory` is missing or is not a directory.
    pub async fn list_files(&self, directory: &str) -> Result<Vec<String>> {
        let target = self.resolve(directory).await?;
        let root = self.workspace.root().to_path_buf();

        blocking(move || {
            if !target.is_dir() {
                return Err(ForgeError::NotADirectory(target));
            }

            let mut files = Vec::new();
            for entry in WalkDir::new(&target).min_depth(1) {
                let entry = entry.map_err(|e| ForgeError::Io(e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Ok(relative) = entry.path().strip_prefix(&root) {
                    files.push(relative.to_string_lossy().to_string());
                }
            }
            files.sort();

            Ok(files)
        })
        .await
    }

    /// Run `cmd` in the workspace root or a contained subdirectory
    pub async fn run_cmd(
        &self,
        cmd: &str,
        cwd: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let dir = match cwd {
            Some(cwd) => self.resolve(cwd).await?,
            None => self.workspace.root().to_path_buf(),
        };

        command::run_shell(cmd, &dir, timeout.unwrap_or(self.command_timeout)).await
    }

    /// Execute a tool call and render its result as the agent sees it
    pub async fn dispatch(&self, call: ToolCall) -> Result<String> {
        debug!("Dispatching {}", call.name());

        match call {
            ToolCall::WriteFile { path, content } => {
                let written = self.write_file(&path, &content).await?;
                Ok(format!("WROTE:{}", written.display()))
            }
            ToolCall::ReadFile { path } => self.read_file(&path).await,
            ToolCall::ListFiles { directory } => {
                let files = self.list_files(&directory).await?;
                if files.is_empty() {
                    Ok(NO_FILES_FOUND.to_string())
                } else {
                    Ok(files.join("\n"))
                }
            }
            ToolCall::GetCurrentDirectory => Ok(self.current_directory().display().to_string()),
            ToolCall::RunCmd { cmd, cwd, timeout } => {
                let output = self
                    .run_cmd(&cmd, cwd.as_deref(), timeout.map(Duration::from_secs))
                    .await?;
                Ok(serde_json::to_string(&output)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn toolbox(dir: &TempDir, id: &str) -> Toolbox {
        let registry = WorkspaceRegistry::new(dir.path(), "generated_project");
        Toolbox::new(registry.bind(id).unwrap(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");

        let written = tools
            .write_file("deep/nested/dir/app.js", "console.log('hi');\n")
            .await
            .unwrap();
        assert!(written.is_absolute());
        assert!(written.starts_with(tools.current_directory()));

        let content = tools.read_file("deep/nested/dir/app.js").await.unwrap();
        assert_eq!(content, "console.log('hi');\n");
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");

        tools.write_file("a.txt", "first").await.unwrap();
        tools.write_file("a.txt", "second").await.unwrap();
        assert_eq!(tools.read_file("a.txt").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");
        assert_eq!(tools.read_file("nope.txt").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_list_empty_workspace() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");

        assert!(tools.list_files(".").await.unwrap().is_empty());
        let rendered = tools
            .dispatch(ToolCall::ListFiles {
                directory: ".".into(),
            })
            .await
            .unwrap();
        assert_eq!(rendered, NO_FILES_FOUND);
    }

    #[tokio::test]
    async fn test_list_is_recursive_relative_and_sorted() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");

        tools.write_file("z.txt", "z").await.unwrap();
        tools.write_file("src/b.rs", "b").await.unwrap();
        tools.write_file("src/a.rs", "a").await.unwrap();
        std::fs::create_dir(tools.current_directory().join("empty")).unwrap();

        let files = tools.list_files(".").await.unwrap();
        assert_eq!(files, vec!["src/a.rs", "src/b.rs", "z.txt"]);

        let sub = tools.list_files("src").await.unwrap();
        assert_eq!(sub, vec!["src/a.rs", "src/b.rs"]);
    }

    #[tokio::test]
    async fn test_list_non_directory() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");
        tools.write_file("file.txt", "x").await.unwrap();

        let err = tools.list_files("file.txt").await.unwrap_err();
        assert!(matches!(err, ForgeError::NotADirectory(_)));
        let err = tools.list_files("missing").await.unwrap_err();
        assert!(matches!(err, ForgeError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn test_every_operation_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");
        let escape = "../../outside.txt";

        let err = tools.write_file(escape, "x").await.unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
        let err = tools.read_file(escape).await.unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
        let err = tools.list_files("..").await.unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));
        let err = tools.run_cmd("true", Some(".."), None).await.unwrap_err();
        assert!(matches!(err, ForgeError::PathEscape { .. }));

        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_workspaces_are_isolated() {
        let dir = TempDir::new().unwrap();
        let a = toolbox(&dir, "A");
        let b = toolbox(&dir, "B");

        let (ra, rb) = tokio::join!(
            a.write_file("only_a.txt", "a"),
            b.write_file("only_b.txt", "b")
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(a.list_files(".").await.unwrap(), vec!["only_a.txt"]);
        assert_eq!(b.list_files(".").await.unwrap(), vec!["only_b.txt"]);
        assert_eq!(b.read_file("only_a.txt").await.unwrap(), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_cmd_in_contained_subdirectory() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");
        tools.write_file("sub/marker.txt", "m").await.unwrap();

        let output = tools.run_cmd("ls", Some("sub"), None).await.unwrap();
        assert_eq!(output.stdout, "marker.txt\n");

        let output = tools.run_cmd("exit 7", None, None).await.unwrap();
        assert_eq!(output.exit_code, 7);
    }

    #[tokio::test]
    async fn test_standalone_uses_default_workspace() {
        let dir = TempDir::new().unwrap();
        let registry = WorkspaceRegistry::new(dir.path(), "generated_project");
        let tools = Toolbox::standalone(&registry, Duration::from_secs(5)).unwrap();

        assert!(tools.current_directory().ends_with("generated_project"));
        assert_eq!(tools.workspace().id(), None);
    }

    #[tokio::test]
    async fn test_dispatch_renders_results() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");

        let call: ToolCall =
            serde_json::from_str(r##"{"tool":"write_file","path":"x.md","content":"# x"}"##)
                .unwrap();
        let rendered = tools.dispatch(call).await.unwrap();
        assert!(rendered.starts_with("WROTE:"));
        assert!(rendered.ends_with("x.md"));

        let call: ToolCall = serde_json::from_str(r#"{"tool":"list_files"}"#).unwrap();
        assert_eq!(tools.dispatch(call).await.unwrap(), "x.md");

        let rendered = tools.dispatch(ToolCall::GetCurrentDirectory).await.unwrap();
        assert_eq!(rendered, tools.current_directory().display().to_string());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_listing_does_not_stall_other_tasks() {
        let dir = TempDir::new().unwrap();
        let tools = toolbox(&dir, "1");
        for i in 0..500 {
            let path = tools.current_directory().join(format!("d{}/f{}.txt", i % 20, i));
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "x").unwrap();
        }

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            })
        };

        let files = tools.list_files(".").await.unwrap();
        assert_eq!(files.len(), 500);
        assert!(ticks.load(Ordering::Relaxed) > 0);
        ticker.abort();
    }
}
