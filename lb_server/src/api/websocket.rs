//! WebSocket handler for realtime tenant event streams.
//!
//! Display boards and operator consoles connect via
//! `GET /ws/{tenant_id}` and receive the tenant's engine events as JSON
//! text frames: called numbers, status changes, winners, and jackpot
//! awards. Inbound text frames carry scheduling commands
//! (`request_next_call` / `cancel_next_call`); anything else is ignored.

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use super::AppState;
use crate::metrics;

/// Commands a connected console may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    RequestNextCall {
        session_id: Uuid,
        delay_secs: Option<u64>,
    },
    CancelNextCall {
        session_id: Uuid,
    },
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(tenant_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, tenant_id, state))
}

async fn handle_socket(socket: WebSocket, tenant_id: Uuid, state: AppState) {
    metrics::websocket_connections_total();
    info!("websocket connected for tenant {tenant_id}");

    let mut events = state.service.dispatcher().subscribe(tenant_id);
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            warn!("failed to serialize event for tenant {tenant_id}: {e}");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                    metrics::websocket_messages_sent();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("websocket for tenant {tenant_id} lagged, skipped {skipped} events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(Message::Text(text))) => {
                    handle_client_message(&state, tenant_id, &text);
                }
                Some(Ok(_)) => {}
            },
        }
    }

    info!("websocket disconnected for tenant {tenant_id}");
}

fn handle_client_message(state: &AppState, tenant_id: Uuid, text: &str) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("ignoring malformed message from tenant {tenant_id}: {e}");
            return;
        }
    };
    match message {
        ClientMessage::RequestNextCall {
            session_id,
            delay_secs,
        } => {
            let delay = delay_secs.unwrap_or(state.defaults.auto_call_interval_secs);
            state
                .service
                .schedule_next_call(session_id, Duration::from_secs(delay));
        }
        ClientMessage::CancelNextCall { session_id } => {
            state.service.cancel_next_call(session_id);
        }
    }
}
