//! External process agent bridge
//!
//! Runs an agent as a child process and serves its tool calls over
//! newline-delimited JSON:
//!
//! 1. forge writes one line with the [`AgentTask`] to the child's stdin
//! 2. the child writes one [`ToolCall`] per line to stdout
//!    (`{"tool":"write_file","path":"a.txt","content":"..."}`)
//! 3. forge answers each with `{"ok":true,"output":"..."}` or
//!    `{"ok":false,"error":"..."}`
//! 4. the child ends the run with `{"tool":"done"}` or by closing stdout
//!
//! The child runs with the workspace root as its cwd, but all file access it
//! requests through the protocol is guard-checked like any other tool call.
//! A tool error is reported back to the child, which is expected to adapt.
//! The run fails if the child exits non-zero, sends a malformed line, or
//! exceeds its recursion limit.

use async_trait::async_trait;
use forge_core::{ForgeError, Result};
use forge_sandbox::{ToolCall, Toolbox};
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tracing::{debug, info, instrument, warn};

use crate::agent::{Agent, AgentTask, StepBudget};

/// Agent backed by an external program
#[derive(Debug, Clone)]
pub struct ProcessAgent {
    program: String,
    args: Vec<String>,
}

impl ProcessAgent {
    /// Build from an argv; the first element is the program
    pub fn new(argv: &[String]) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ForgeError::Config("agent command is empty".to_string()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

async fn write_line(stdin: &mut ChildStdin, value: &Value) -> Result<()> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await?;
    Ok(())
}

fn is_done(value: &Value) -> bool {
    value.get("tool").and_then(Value::as_str) == Some("done")
}

#[async_trait]
impl Agent for ProcessAgent {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self, task, tools), fields(program = %self.program, project_id = %task.project_id))]
    async fn run(&self, task: AgentTask, tools: Toolbox) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(tools.current_directory())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ForgeError::AgentFailure(format!("Failed to start {}: {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ForgeError::AgentFailure("agent stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ForgeError::AgentFailure("agent stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        write_line(&mut stdin, &serde_json::to_value(&task)?).await?;

        let mut budget = StepBudget::new(task.recursion_limit);
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(&line).map_err(|e| {
                ForgeError::AgentFailure(format!("Malformed agent message: {}", e))
            })?;
            if is_done(&value) {
                debug!("Agent signalled completion");
                break;
            }

            let call: ToolCall = serde_json::from_value(value).map_err(|e| {
                ForgeError::AgentFailure(format!("Unknown tool call: {}", e))
            })?;
            budget.take()?;

            let reply = match tools.dispatch(call).await {
                Ok(output) => json!({ "ok": true, "output": output }),
                Err(e) if e.is_contract_violation() => {
                    warn!("Agent tool call rejected: {}", e);
                    json!({ "ok": false, "error": e.to_string() })
                }
                Err(e) => {
                    debug!("Tool call failed: {}", e);
                    json!({ "ok": false, "error": e.to_string() })
                }
            };
            write_line(&mut stdin, &reply).await?;
        }

        drop(stdin);
        let status = child.wait().await?;
        if !status.success() {
            warn!("Agent process exited with {}", status);
            return Err(ForgeError::AgentFailure(format!(
                "agent process exited with {}",
                status
            )));
        }

        info!("Agent finished after {} tool calls", budget.used());
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use forge_sandbox::WorkspaceRegistry;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sh(script: &str) -> ProcessAgent {
        ProcessAgent::new(&["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
    }

    fn setup(dir: &TempDir) -> Toolbox {
        let registry = WorkspaceRegistry::new(dir.path(), "gp");
        Toolbox::new(registry.bind("1").unwrap(), Duration::from_secs(5))
    }

    fn task(limit: u32) -> AgentTask {
        AgentTask {
            user_prompt: "hello".to_string(),
            project_id: "1".to_string(),
            recursion_limit: limit,
        }
    }

    #[test]
    fn test_empty_argv_rejected() {
        assert!(matches!(
            ProcessAgent::new(&[]).unwrap_err(),
            ForgeError::Config(_)
        ));
    }

    #[tokio::test]
    async fn test_tool_calls_are_served() {
        let dir = TempDir::new().unwrap();
        let tools = setup(&dir);
        let agent = sh(r#"read task
echo "$task" > task.json
echo '{"tool":"write_file","path":"src/hello.txt","content":"hi"}'
read reply
echo '{"tool":"done"}'"#);

        agent.run(task(10), tools.clone()).await.unwrap();

        assert_eq!(tools.read_file("src/hello.txt").await.unwrap(), "hi");
        let sent: Value =
            serde_json::from_str(&tools.read_file("task.json").await.unwrap()).unwrap();
        assert_eq!(sent["user_prompt"], "hello");
        assert_eq!(sent["project_id"], "1");
        assert_eq!(sent["recursion_limit"], 10);
    }

    #[tokio::test]
    async fn test_escape_is_reported_to_agent() {
        let dir = TempDir::new().unwrap();
        let tools = setup(&dir);
        let agent = sh(r#"read task
echo '{"tool":"write_file","path":"../../evil.txt","content":"x"}'
read reply
echo "$reply" > reply.json"#);

        agent.run(task(10), tools.clone()).await.unwrap();

        let reply: Value =
            serde_json::from_str(&tools.read_file("reply.json").await.unwrap()).unwrap();
        assert_eq!(reply["ok"], false);
        assert!(reply["error"].as_str().unwrap().contains("escapes"));
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let dir = TempDir::new().unwrap();
        let err = sh("read task; exit 3")
            .run(task(10), setup(&dir))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::AgentFailure(_)));
    }

    #[tokio::test]
    async fn test_malformed_line_fails() {
        let dir = TempDir::new().unwrap();
        let err = sh("read task; echo 'not json'; read reply")
            .run(task(10), setup(&dir))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Malformed"));
    }

    #[tokio::test]
    async fn test_recursion_limit_enforced() {
        let dir = TempDir::new().unwrap();
        let agent = sh(r#"read task
while true; do
  echo '{"tool":"get_current_directory"}'
  read reply || exit 0
done"#);

        let err = agent.run(task(3), setup(&dir)).await.unwrap_err();
        assert!(err.to_string().contains("Recursion limit of 3"));
    }
}
