//! Command sandbox
//!
//! Runs a command string through the platform shell so agents can use pipes
//! and redirects. Containment is limited to the working directory: the cwd is
//! always a guard-resolved path inside the workspace. The command itself can
//! do anything the server's user can do.
//!
//! A command that outlives its timeout is killed together with every process
//! it started, and reported as `ForgeError::Timeout`; no partial output is
//! returned. On unix the shell leads its own process group so that the whole
//! group can be signalled.

use forge_core::{ForgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, instrument, warn};

/// Result of a completed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// Exit status, `-1` when the process was terminated by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        #[cfg(unix)]
        c.process_group(0);
        c
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Wait for the shell and drain both pipes until every writer has closed them
async fn collect_output(child: &mut Child) -> std::io::Result<Output> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, stdout, stderr) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
    Ok(Output {
        status: status?,
        stdout: stdout?,
        stderr: stderr?,
    })
}

/// SIGKILL the process group led by `pgid`, then reap the shell
#[cfg(unix)]
async fn kill_process_group(child: &mut Child, pgid: Option<u32>) {
    if let Some(pgid) = pgid.and_then(|id| i32::try_from(id).ok()) {
        // SAFETY: kill(2) with a negative pid and a valid signal number
        let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
        if rc == -1 {
            let errno = std::io::Error::last_os_error();
            if errno.raw_os_error() != Some(libc::ESRCH) {
                warn!("Failed to kill process group {}: {}", pgid, errno);
            }
        }
    }
    if let Err(e) = child.kill().await {
        debug!("Shell already gone: {}", e);
    }
}

#[cfg(not(unix))]
async fn kill_process_group(child: &mut Child, _pgid: Option<u32>) {
    if let Err(e) = child.kill().await {
        debug!("Shell already gone: {}", e);
    }
}

/// Run `command` in `cwd`, killing it and its descendants after `timeout`.
///
/// `cwd` must already have been resolved through the guard.
#[instrument(skip(command), fields(cwd = %cwd.display()))]
pub async fn run_shell(command: &str, cwd: &Path, timeout: Duration) -> Result<CommandOutput> {
    debug!("Executing {:?}", command);

    let mut child = shell_command(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;
    // Equal to the process group id on unix; gone from `child` once reaped
    let pgid = child.id();

    let finished = tokio::time::timeout(timeout, collect_output(&mut child)).await;
    match finished {
        Ok(Ok(output)) => {
            let output = CommandOutput::from(output);
            if !output.success() {
                debug!("Command exited with {}", output.exit_code);
            }
            Ok(output)
        }
        Ok(Err(e)) => Err(ForgeError::Io(e)),
        Err(_) => {
            warn!("Command timed out after {:?}: {:?}", timeout, command);
            kill_process_group(&mut child, pgid).await;
            Err(ForgeError::Timeout {
                seconds: timeout.as_secs(),
            })
        }
    }
}
