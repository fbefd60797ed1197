//! WebSocket broadcast channel.
//!
//! Every text frame a client sends is relayed to all connected clients as
//! `Client {client_id}: {text}`. Clients are keyed by the id in the path; connecting again with an
//! id that is already registered replaces the earlier connection. A client whose outbox fills up
//! is disconnected rather than buffered without bound.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::AppState;

/// Messages queued for one client before it is considered too slow
pub const OUTBOX_CAPACITY: usize = 64;

struct Connection {
    generation: u64,
    outbox: mpsc::Sender<String>,
}

/// Registry of connected WebSocket clients
#[derive(Default)]
pub struct ConnectionHub {
    connections: DashMap<String, Connection>,
    next_generation: AtomicU64,
}

/// A client's place in the hub. Messages broadcast to the client arrive on `inbox`.
pub struct Registration {
    pub client_id: String,
    pub generation: u64,
    pub inbox: mpsc::Receiver<String>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, client_id: &str) -> Registration {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);

        if self
            .connections
            .insert(client_id.to_string(), Connection { generation, outbox })
            .is_some()
        {
            info!(client_id, "Replaced existing WebSocket connection");
        }

        Registration {
            client_id: client_id.to_string(),
            generation,
            inbox,
        }
    }

    /// Remove a registration, unless a newer connection has since taken over its id
    pub fn unregister(&self, client_id: &str, generation: u64) {
        self.connections
            .remove_if(client_id, |_, conn| conn.generation == generation);
    }

    /// Send `message` to every client. Returns how many clients it was queued for.
    ///
    /// Clients with a full outbox are dropped from the hub, which closes their connection.
    pub fn broadcast(&self, message: &str) -> usize {
        let mut delivered = 0;
        let mut lagging = Vec::new();
        for entry in self.connections.iter() {
            match entry.outbox.try_send(message.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => lagging.push((entry.key().clone(), entry.generation)),
                Err(TrySendError::Closed(_)) => warn!(client_id = %entry.key(), "Broadcast to closed connection skipped"),
            }
        }

        for (client_id, generation) in lagging {
            warn!(client_id, "Disconnecting WebSocket client with a full outbox");
            self.unregister(&client_id, generation);
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

pub async fn websocket(ws: WebSocketUpgrade, Path(client_id): Path<String>, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state.ws_hub))
}

async fn handle_socket(socket: WebSocket, client_id: String, hub: Arc<ConnectionHub>) {
    let Registration {
        client_id,
        generation,
        mut inbox,
    } = hub.register(&client_id);
    info!(client_id, "WebSocket client connected");

    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if sink.send(Message::Text(message.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let delivered = hub.broadcast(&format!("Client {client_id}: {}", text.as_str()));
                    debug!(client_id, delivered, "Relayed message");
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(client_id, "WebSocket error: {}", e);
                    break;
                }
            },
            // Writer stops when the socket can no longer be written or the registration was dropped
            _ = &mut writer => break,
        }
    }

    writer.abort();
    hub.unregister(&client_id, generation);
    info!(client_id, "WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let hub = ConnectionHub::new();
        let mut alice = hub.register("alice");
        let mut bob = hub.register("bob");

        assert_eq!(hub.broadcast("Client alice: hello"), 2);
        assert_eq!(alice.inbox.recv().await.unwrap(), "Client alice: hello");
        assert_eq!(bob.inbox.recv().await.unwrap(), "Client alice: hello");
    }

    #[tokio::test]
    async fn test_reconnect_replaces_registration() {
        let hub = ConnectionHub::new();
        let mut first = hub.register("alice");
        let mut second = hub.register("alice");
        assert_eq!(hub.len(), 1);

        hub.broadcast("ping");
        assert_eq!(second.inbox.recv().await.unwrap(), "ping");
        // The replaced connection's channel is closed
        assert!(first.inbox.recv().await.is_none());

        // The stale registration must not evict the new one
        hub.unregister(&first.client_id, first.generation);
        assert_eq!(hub.len(), 1);
        hub.unregister(&second.client_id, second.generation);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_slow_client_is_disconnected() {
        let hub = ConnectionHub::new();
        let mut slow = hub.register("slow");
        let mut fast = hub.register("fast");

        for i in 0..OUTBOX_CAPACITY {
            assert_eq!(hub.broadcast(&format!("message {i}")), 2);
            fast.inbox.recv().await.unwrap();
        }

        // The slow client's outbox is full, so it is dropped instead of queuing more
        assert_eq!(hub.broadcast("one too many"), 1);
        assert_eq!(hub.len(), 1);
        assert_eq!(fast.inbox.recv().await.unwrap(), "one too many");

        let mut queued = 0;
        while slow.inbox.recv().await.is_some() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOX_CAPACITY);
    }

    #[test]
    fn test_dead_connection_is_skipped() {
        let hub = ConnectionHub::new();
        let gone = hub.register("gone");
        let _live = hub.register("live");
        drop(gone);

        assert_eq!(hub.broadcast("anyone there?"), 1);
        assert_eq!(hub.len(), 2);
    }
}
