//! Agent trait and the task handed to it

use async_trait::async_trait;
use forge_core::{ForgeError, Result};
use forge_sandbox::Toolbox;
use serde::{Deserialize, Serialize};

/// What an agent is asked to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTask {
    pub user_prompt: String,
    pub project_id: String,
    /// Maximum number of tool calls the agent may make
    pub recursion_limit: u32,
}

/// An agent that materialises a project through a bound toolbox.
///
/// The toolbox is already bound to the job's workspace when `run` is called.
/// Returning `Err` marks the job as failed; tool errors the agent can recover
/// from should be handled inside `run`.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Run to completion
    async fn run(&self, task: AgentTask, tools: Toolbox) -> Result<()>;
}

/// Counts tool calls against a task's recursion limit
#[derive(Debug, Clone)]
pub struct StepBudget {
    limit: u32,
    used: u32,
}

impl StepBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Spend one step, failing once the limit is exhausted
    pub fn take(&mut self) -> Result<()> {
        if self.used >= self.limit {
            return Err(ForgeError::AgentFailure(format!(
                "Recursion limit of {} reached without completion",
                self.limit
            )));
        }
        self.used += 1;
        Ok(())
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}
