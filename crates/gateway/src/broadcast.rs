//! Outbound delivery: per-connection channels and the log ring buffer.
//!
//! Each connection owns an mpsc channel; a writer task drains it onto the
//! socket. Broadcast is best-effort: a full or closed channel drops that
//! one frame for that one client and never blocks the sender.

use crate::protocol::ServerMessage;
use skylark_core::error::ConnectionError;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

const OUTBOUND_BUFFER: usize = 64;

/// The set of live connections, keyed by client id.
pub struct ConnectionManager {
    connections: RwLock<HashMap<String, mpsc::Sender<ServerMessage>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection. The receiver feeds the client's writer
    /// task; the sender is the handler's identity, used to guard teardown.
    /// A reconnect under the same id replaces the old channel, which ends
    /// the stale writer task.
    pub async fn register(
        &self,
        client_id: &str,
    ) -> (mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        let mut connections = self.connections.write().await;
        if connections.insert(client_id.to_string(), tx.clone()).is_some() {
            debug!(client_id = %client_id, "Replaced existing connection");
        }
        (tx, rx)
    }

    pub async fn unregister(&self, client_id: &str) {
        self.connections.write().await.remove(client_id);
    }

    /// Remove the registration for `client_id` only if it still belongs
    /// to `sender`; returns whether a removal happened. A handler whose
    /// registration was replaced by a reconnect must not tear down the
    /// replacement.
    pub async fn unregister_if(
        &self,
        client_id: &str,
        sender: &mpsc::Sender<ServerMessage>,
    ) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(client_id) {
            Some(tx) if tx.same_channel(sender) => {
                connections.remove(client_id);
                true
            }
            _ => false,
        }
    }

    /// Deliver a frame to one client.
    pub async fn send_to(
        &self,
        client_id: &str,
        message: ServerMessage,
    ) -> Result<(), ConnectionError> {
        let tx = {
            let connections = self.connections.read().await;
            connections.get(client_id).cloned()
        };
        let tx = tx.ok_or_else(|| ConnectionError::Closed(client_id.to_string()))?;
        tx.send(message)
            .await
            .map_err(|e| ConnectionError::DeliveryFailed {
                client_id: client_id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Best-effort delivery to every connected client. Clients whose
    /// channel has closed are pruned from the set; a full channel only
    /// drops this one frame.
    pub async fn broadcast(&self, message: &ServerMessage) {
        let mut stale = Vec::new();
        {
            let connections = self.connections.read().await;
            for (client_id, tx) in connections.iter() {
                match tx.try_send(message.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => stale.push(client_id.clone()),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(client_id = %client_id, "Dropped broadcast frame");
                    }
                }
            }
        }
        if !stale.is_empty() {
            let mut connections = self.connections.write().await;
            for client_id in stale {
                // Re-check under the write lock: the client may have
                // reconnected since the send pass.
                if connections.get(&client_id).is_some_and(|tx| tx.is_closed()) {
                    debug!(client_id = %client_id, "Pruned stale connection");
                    connections.remove(&client_id);
                }
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Bounded buffer of recent log lines, served by the logs endpoint.
pub struct LogBuffer {
    lines: std::sync::Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: std::sync::Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line.into());
    }

    /// Oldest-first copy of the buffered lines.
    pub fn recent(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(100)
    }
}
