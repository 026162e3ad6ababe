//! WebSocket upgrade handler for the push channel
//!
//! The channel accepts connections at the server root but is not wired to
//! the broadcaster: no events are delivered, clients poll over HTTP.

use std::sync::atomic::Ordering;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tracing::{debug, info};

use crate::app::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Hold the connection open and answer pings; deliver nothing until the
/// push channel is wired to a real `Broadcaster`.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let viewers = state.viewers.clone();
    let count = viewers.fetch_add(1, Ordering::Relaxed) + 1;
    info!(viewers = count, "Viewer connected to push channel");

    while let Some(result) = socket.recv().await {
        match result {
            Ok(Message::Ping(payload)) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            Ok(Message::Close(_)) => {
                debug!("Viewer initiated close");
                break;
            }
            Ok(_) => {
                debug!("Ignoring inbound message on push channel");
            }
            Err(e) => {
                debug!(error = %e, "Push channel error");
                break;
            }
        }
    }

    let count = viewers.fetch_sub(1, Ordering::Relaxed) - 1;
    info!(viewers = count, "Viewer disconnected from push channel");
}
