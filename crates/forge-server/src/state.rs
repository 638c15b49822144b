//! Shared application state

use chrono::Utc;
use forge_agent::Agent;
use forge_core::{ForgeConfig, JobSettings};
use forge_sandbox::WorkspaceRegistry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// State shared by every connection and route
pub struct AppState {
    pub registry: WorkspaceRegistry,
    pub agent: Arc<dyn Agent>,
    pub jobs: JobSettings,
    pub command_timeout: Duration,
    pub ids: JobIdAllocator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: &ForgeConfig, agent: Arc<dyn Agent>) -> Self {
        Self {
            registry: WorkspaceRegistry::from_settings(&config.workspace),
            agent,
            jobs: config.jobs.clone(),
            command_timeout: config.sandbox.command_timeout(),
            ids: JobIdAllocator::new(),
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

/// Hands out job ids derived from the submission time in milliseconds.
///
/// Ids are strictly increasing within a process, so two jobs submitted in
/// the same millisecond still get distinct workspaces.
#[derive(Debug, Default)]
pub struct JobIdAllocator {
    last: AtomicU64,
}

impl JobIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut prev = self.last.load(Ordering::Relaxed);

        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate.to_string(),
                Err(actual) => prev = actual,
            }
        }
    }
}
