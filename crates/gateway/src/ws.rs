//! Per-connection WebSocket handling.
//!
//! Each connection runs two tasks: a writer that drains the outbound
//! channel onto the socket, and the reader loop below. Inbound frames are
//! processed sequentially, so a client's own messages are answered in the
//! order they arrive; other connections run on their own tasks and are
//! never delayed by this one.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::GatewayState;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use skylark_core::session::Session;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, client_id))
}

async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, client_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut outbound) = state.connections.register(&client_id).await;

    // Writer task: ends when the channel is dropped on unregister or the
    // socket goes away.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let json = serde_json::to_string(&frame).unwrap_or_default();
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let session = state.sessions.get_or_create(&client_id).await;
    info!(client_id = %client_id, "Client connected");
    state
        .log_event("info", format!("Client {client_id} connected"))
        .await;

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue, // ignore binary, ping, pong
            Err(_) => break,
        };
        if !process_frame(&state, &session, &client_id, &text).await {
            break;
        }
    }

    // A reconnect under the same id replaces the registration; the stale
    // handler must not tear down the replacement or its session.
    if state.connections.unregister_if(&client_id, &tx).await {
        state.sessions.remove(&client_id).await;
    }
    writer.abort();
    info!(client_id = %client_id, "Client disconnected");
    state
        .log_event("info", format!("Client {client_id} disconnected"))
        .await;
}

/// Handle one inbound text frame. Returns false when the connection
/// should close.
async fn process_frame(
    state: &GatewayState,
    session: &Session,
    client_id: &str,
    text: &str,
) -> bool {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!(client_id = %client_id, error = %e, "Invalid client frame");
            let _ = state
                .connections
                .send_to(client_id, ServerMessage::error("Invalid message format"))
                .await;
            return true;
        }
    };

    match client_msg {
        ClientMessage::Message { content } => {
            state
                .log_event("info", format!("Processing message from {client_id}"))
                .await;
            state
                .connections
                .broadcast(&ServerMessage::typing(client_id, true))
                .await;

            // Awaited inline: turns within this session stay ordered.
            let reply = state.agent.run(session, &content).await;

            state
                .connections
                .broadcast(&ServerMessage::typing(client_id, false))
                .await;
            match state
                .connections
                .send_to(client_id, ServerMessage::response(reply, client_id))
                .await
            {
                Ok(()) => {
                    state
                        .log_event("info", format!("Response delivered to {client_id}"))
                        .await;
                    true
                }
                Err(_) => {
                    warn!(client_id = %client_id, "Failed to deliver response");
                    false
                }
            }
        }
        ClientMessage::Typing { is_typing } => {
            state
                .connections
                .broadcast(&ServerMessage::typing(client_id, is_typing))
                .await;
            true
        }
        ClientMessage::Ping => {
            let _ = state
                .connections
                .send_to(client_id, ServerMessage::pong())
                .await;
            true
        }
    }
}
