//! Wire types shared by the sandbox, the agents and the session server

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ForgeError, Result};

/// Default step budget handed to the agent when a request omits one
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// A named phase of a job's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planning,
    Architecting,
    Coding,
    Complete,
    Error,
}

impl Stage {
    /// Whether no further events follow this stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Error)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Architecting => "architecting",
            Stage::Coding => "coding",
            Stage::Complete => "complete",
            Stage::Error => "error",
        };
        f.write_str(name)
    }
}

/// Outbound progress notification for a single job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StatusEvent {
    /// Create an event stamped with the current time
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Attach a structured payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// The `project_id` carried in the payload, if any
    pub fn project_id(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("project_id"))
            .and_then(|v| v.as_str())
    }
}

/// Snapshot of one file left in a workspace after a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path relative to the workspace root
    pub filepath: String,
    pub content: String,
    /// Content type classified from the file extension
    pub language: String,
}

/// Inbound message on a session connection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start a new code-generation job
    Generate {
        prompt: String,
        #[serde(default)]
        recursion_limit: Option<u32>,
    },
}

/// A validated job submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub prompt: String,
    pub recursion_limit: u32,
}

impl JobRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Build from a client message, filling in `default_limit` when the
    /// message carries no recursion limit
    pub fn from_message(msg: ClientMessage, default_limit: u32) -> Self {
        match msg {
            ClientMessage::Generate {
                prompt,
                recursion_limit,
            } => Self {
                prompt,
                recursion_limit: recursion_limit.unwrap_or(default_limit),
            },
        }
    }
}

/// Response body of a workspace deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Check that a job id can safely name a workspace directory.
///
/// Ids are opaque to callers but end up inside a directory name, so only
/// ASCII alphanumerics, `-` and `_` are accepted.
pub fn validate_job_id(id: &str) -> Result<&str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(id)
    } else {
        Err(ForgeError::InvalidJobId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serializes_lowercase() {
        let json = serde_json::to_string(&Stage::Architecting).unwrap();
        assert_eq!(json, "\"architecting\"");
        assert!(Stage::Complete.is_terminal());
        assert!(Stage::Error.is_terminal());
        assert!(!Stage::Coding.is_terminal());
    }

    #[test]
    fn test_status_event_shape() {
        let event = StatusEvent::new(Stage::Planning, "Planning project")
            .with_data(serde_json::json!({ "project_id": "42" }));
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["stage"], "planning");
        assert_eq!(value["message"], "Planning project");
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
        assert_eq!(value["data"]["project_id"], "42");
        assert_eq!(event.project_id(), Some("42"));
    }

    #[test]
    fn test_status_event_without_data_omits_field() {
        let value = serde_json::to_value(StatusEvent::new(Stage::Error, "boom")).unwrap();
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_generate_message_defaults_recursion_limit() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"generate","prompt":"hello"}"#).unwrap();
        let request = JobRequest::from_message(msg, DEFAULT_RECURSION_LIMIT);
        assert_eq!(request.prompt, "hello");
        assert_eq!(request.recursion_limit, 100);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"generate","prompt":"x","recursion_limit":7}"#)
                .unwrap();
        assert_eq!(JobRequest::from_message(msg, 100).recursion_limit, 7);
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"cancel"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_job_id() {
        assert!(validate_job_id("1758120104931").is_ok());
        assert!(validate_job_id("my-job_2").is_ok());
        assert!(validate_job_id("").is_err());
        assert!(validate_job_id("../etc").is_err());
        assert!(validate_job_id("a/b").is_err());
        assert!(validate_job_id("a b").is_err());
    }
}
