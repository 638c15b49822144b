//! # forge-server
//!
//! Session orchestrator and network surface for forge.
//!
//! Clients connect to `/ws`, submit `{"type":"generate","prompt":...}` and
//! receive staged status events for each job they submit. Workspaces are
//! purged with `DELETE /api/projects/:project_id`.

mod job;
mod orchestrator;
mod routes;
mod session;
mod state;

pub use job::{transition, JobEvent, JobState};
pub use orchestrator::{run_job, EventSender, JobOutcome};
pub use state::{AppState, JobIdAllocator, SharedState};

use axum::{
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ws", get(session::ws_handler))
        .route("/api/projects/:project_id", delete(routes::delete_project))
        .route("/api/health", get(routes::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process stops
pub async fn serve(state: SharedState, addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(state, listener).await
}

/// Serve on an already bound listener
pub async fn serve_listener(state: SharedState, listener: TcpListener) -> anyhow::Result<()> {
    info!("forge listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
