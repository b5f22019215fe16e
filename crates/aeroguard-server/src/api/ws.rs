//! WebSocket streaming of dashboard updates.
use crate::state::{AppState, StateUpdate};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    let vehicle_filter = params.vehicle_filter();
    ws.on_upgrade(move |socket| handle_socket(socket, state, vehicle_filter))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    vehicle_id: Option<String>,
}

impl WsQuery {
    /// Vehicle to follow; blank means every vehicle.
    fn vehicle_filter(self) -> Option<String> {
        self.vehicle_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }
}

fn wants(update: &StateUpdate, vehicle_filter: Option<&str>) -> bool {
    vehicle_filter.map_or(true, |vehicle_id| update.vehicle_id == vehicle_id)
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, vehicle_filter: Option<String>) {
    let mut rx = state.tx.subscribe();

    // Start every client from the current picture.
    let initial = match vehicle_filter.as_deref() {
        Some(vehicle_id) => state.get_vehicle(vehicle_id),
        None => Some(state.current()),
    };
    if let Some(view) = initial {
        if let Ok(payload) = serde_json::to_string(&view) {
            if socket.send(Message::Text(payload)).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(update) => {
                        if !wants(&update, vehicle_filter.as_deref()) {
                            continue;
                        }
                        if socket.send(Message::Text(update.payload.as_ref().to_owned())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("WebSocket client lagged, skipped {} update(s)", skipped);
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
