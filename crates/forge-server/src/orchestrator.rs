//! Session orchestrator
//!
//! Drives one job from submission to a terminal stage:
//!
//! 1. Allocate a job id and emit synthetic planning/architecting/coding events
//!    so the client gets feedback before the agent produces anything
//! 2. Bind a fresh workspace for the job
//! 3. Run the agent on its own task, awaiting its handle without blocking
//!    the connection that submitted the job
//! 4. Collect artifacts and emit `complete`, or emit `error` on any failure
//!
//! Events for one job are sent from this single task, in order, into the
//! connection's outbound channel. A closed connection does not stop the job;
//! its events are dropped and its workspace stays on disk.

use forge_agent::AgentTask;
use forge_core::{Artifact, ForgeError, JobRequest, Result, StatusEvent};
use forge_sandbox::{collect_job_artifacts, Toolbox};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::job::{transition, JobEvent, JobState};
use crate::state::SharedState;

/// Outbound event channel of one connection
pub type EventSender = mpsc::Sender<StatusEvent>;

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub project_id: String,
    pub state: JobState,
}

/// Tracks a job's state and reports each transition to its connection
struct JobReporter {
    project_id: String,
    state: JobState,
    events: EventSender,
}

impl JobReporter {
    fn new(project_id: String, events: EventSender) -> Self {
        Self {
            project_id,
            state: JobState::Received,
            events,
        }
    }

    /// Apply `event` and emit the resulting stage with `data` merged into a
    /// payload that always carries the project id
    async fn emit(&mut self, event: JobEvent, message: impl Into<String>, data: Value) {
        if self.state.is_terminal() {
            warn!(
                "Dropping {:?} for finished job {}",
                event, self.project_id
            );
            return;
        }

        self.state = transition(self.state, event);
        let Some(stage) = self.state.stage() else {
            return;
        };

        let mut payload = json!({ "project_id": self.project_id });
        if let (Some(payload), Value::Object(extra)) = (payload.as_object_mut(), data) {
            payload.extend(extra);
        }

        let status = StatusEvent::new(stage, message).with_data(payload);
        if self.events.send(status).await.is_err() {
            debug!(
                "Connection gone, {} event for job {} not delivered",
                stage, self.project_id
            );
        }
    }
}

fn preview(prompt: &str, max_chars: usize) -> String {
    prompt.chars().take(max_chars).collect()
}

/// Run one job to completion, streaming its stages into `events`
#[instrument(skip_all)]
pub async fn run_job(app: SharedState, request: JobRequest, events: EventSender) -> JobOutcome {
    let project_id = app.ids.next_id();
    info!("Job {} received: {:?}", project_id, preview(&request.prompt, 50));

    let mut reporter = JobReporter::new(project_id.clone(), events);
    let delay = app.jobs.preflight_delay();

    reporter
        .emit(
            JobEvent::Plan,
            format!("Planning project: {}...", preview(&request.prompt, 50)),
            json!({}),
        )
        .await;
    tokio::time::sleep(delay).await;

    reporter
        .emit(
            JobEvent::Plan,
            "Creating project plan...",
            json!({
                "plan": {
                    "name": "Generated Project",
                    "description": request.prompt,
                    "tech_stack": ["HTML", "CSS", "JavaScript"],
                }
            }),
        )
        .await;
    tokio::time::sleep(delay).await;

    reporter
        .emit(
            JobEvent::Architect,
            "Designing architecture...",
            json!({ "files": ["index.html", "style.css", "script.js"] }),
        )
        .await;
    tokio::time::sleep(delay).await;

    reporter
        .emit(JobEvent::Code, "Generating code...", json!({}))
        .await;

    match execute(&app, &project_id, &request).await {
        Ok(files) => {
            info!("Job {} complete with {} files", project_id, files.len());
            reporter
                .emit(
                    JobEvent::Finish,
                    "Project generated successfully!",
                    json!({ "files": files }),
                )
                .await;
        }
        Err(e) => {
            error!("Job {} failed: {}", project_id, e);
            reporter
                .emit(JobEvent::Fail, format!("Error: {}", e), json!({}))
                .await;
        }
    }

    JobOutcome {
        project_id,
        state: reporter.state,
    }
}

/// Bind the workspace, run the agent on a background task and collect
/// what it left behind
async fn execute(app: &SharedState, project_id: &str, request: &JobRequest) -> Result<Vec<Artifact>> {
    let workspace = app.registry.bind(project_id)?;
    let tools = Toolbox::new(workspace, app.command_timeout);
    let task = AgentTask {
        user_prompt: request.prompt.clone(),
        project_id: project_id.to_string(),
        recursion_limit: request.recursion_limit,
    };

    let agent = Arc::clone(&app.agent);
    debug!("Dispatching job {} to agent {}", project_id, agent.name());
    let handle = tokio::spawn(async move { agent.run(task, tools).await });

    handle
        .await
        .map_err(|e| ForgeError::AgentFailure(format!("agent task aborted: {}", e)))??;

    let registry = app.registry.clone();
    let id = project_id.to_string();
    tokio::task::spawn_blocking(move || collect_job_artifacts(&registry, &id))
        .await
        .map_err(|e| ForgeError::AgentFailure(format!("artifact collection aborted: {}", e)))?
}
