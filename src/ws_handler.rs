//! WebSocket handler for real-time updates to browser clients

use crate::broadcaster::event_frame;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Handle WebSocket upgrade request
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe to the broadcaster before pushing initial state, so no
    // update published in between is lost.
    let mut broadcast_rx = state.broadcaster.subscribe();

    info!("New WebSocket client connected");

    // Late joiners only see future events, so seed them with the current
    // aggregates using the same frames as live updates.
    if let Ok(frame) = event_frame("lora_event", &state.store.snapshot_link_state()) {
        if sender.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }
    if let Ok(frame) = event_frame("ozimux_event", &state.store.snapshot_position_sources()) {
        if sender.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    // Spawn task to forward broadcasts to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!("WebSocket client lagged by {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Handle incoming messages from client
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    debug!("Received from client: {}", text);
                    if let Ok(msg) = serde_json::from_str::<serde_json::Value>(&text) {
                        match msg.get("type").and_then(|t| t.as_str()) {
                            Some("subscribe") => {
                                // Every client already receives everything
                                debug!("Client subscribed");
                            }
                            Some("ping") => {
                                debug!("Client ping");
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Message::Ping(_)) => {
                    // Handled automatically by axum
                }
                Ok(Message::Close(_)) => {
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
