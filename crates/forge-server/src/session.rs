//! WebSocket session handling
//!
//! One connection can submit any number of jobs. The read loop never waits on
//! a job: each submission is spawned as its own task that streams events into
//! the connection's outbound channel, and a writer task forwards them to the
//! socket in the order they were queued.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use forge_core::{ClientMessage, JobRequest, StatusEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::orchestrator;
use crate::state::SharedState;

/// Outbound events buffered per connection before job tasks wait for the socket
const EVENT_BUFFER: usize = 64;

/// GET /ws - upgrade to a session connection
pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: SharedState) {
    info!("Session connected");
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<StatusEvent>(EVENT_BUFFER);

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode status event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                debug!("Socket closed, stopping event writer");
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Session read error: {}", e);
                break;
            }
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => {
                let request =
                    JobRequest::from_message(message, app.jobs.default_recursion_limit);
                tokio::spawn(orchestrator::run_job(app.clone(), request, tx.clone()));
            }
            Err(e) => warn!("Ignoring unrecognised message: {}", e),
        }
    }

    // In-flight jobs keep their own senders and run to completion.
    info!("Session disconnected");
}
