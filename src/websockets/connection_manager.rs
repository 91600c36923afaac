use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Registry of live connections and the room channels they are subscribed to.
///
/// Connections are keyed by connection ID, so one user may hold several.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(
        &self,
        connection_id: String,
        user_id: String,
        sender: mpsc::UnboundedSender<String>,
    );

    /// Drops the connection and all of its subscriptions
    async fn remove_connection(&self, connection_id: &str);

    /// Returns false if the connection is unknown or already subscribed
    async fn subscribe(&self, connection_id: &str, room_id: &str) -> bool;

    /// Returns false if the connection was not subscribed
    async fn unsubscribe(&self, connection_id: &str, room_id: &str) -> bool;

    async fn is_subscribed(&self, connection_id: &str, room_id: &str) -> bool;

    async fn send_to_connection(&self, connection_id: &str, message: &str) -> bool;

    /// Sends to every subscriber of the room except `except`, returning the number reached
    async fn send_to_room(&self, room_id: &str, message: &str, except: Option<&str>) -> usize;

    /// Sends once to every connection subscribed to at least one of the rooms
    async fn send_to_rooms(&self, room_ids: &[String], message: &str) -> usize;

    async fn broadcast(&self, message: &str) -> usize;

    async fn connection_count(&self) -> usize;
}

struct ConnectionEntry {
    user_id: String,
    sender: mpsc::UnboundedSender<String>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct Registry {
    // connection_id -> entry
    connections: HashMap<String, ConnectionEntry>,
    // room_id -> connection_ids
    rooms: HashMap<String, HashSet<String>>,
}

impl Registry {
    fn deliver(&self, connection_id: &str, message: &str) -> bool {
        self.connections
            .get(connection_id)
            .map(|entry| entry.sender.send(message.to_string()).is_ok())
            .unwrap_or(false)
    }
}

pub struct InMemoryConnectionManager {
    registry: Arc<RwLock<Registry>>,
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
        }
    }

    /// User IDs of the live connections subscribed to a room
    pub async fn room_members(&self, room_id: &str) -> Vec<String> {
        let registry = self.registry.read().await;
        let mut users: Vec<String> = registry
            .rooms
            .get(room_id)
            .into_iter()
            .flatten()
            .filter_map(|id| registry.connections.get(id))
            .map(|entry| entry.user_id.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(
        &self,
        connection_id: String,
        user_id: String,
        sender: mpsc::UnboundedSender<String>,
    ) {
        let mut registry = self.registry.write().await;
        registry.connections.insert(
            connection_id,
            ConnectionEntry {
                user_id,
                sender,
                rooms: HashSet::new(),
            },
        );
    }

    async fn remove_connection(&self, connection_id: &str) {
        let mut registry = self.registry.write().await;
        let Some(entry) = registry.connections.remove(connection_id) else {
            return;
        };

        for room_id in entry.rooms {
            if let Some(subscribers) = registry.rooms.get_mut(&room_id) {
                subscribers.remove(connection_id);
                if subscribers.is_empty() {
                    registry.rooms.remove(&room_id);
                }
            }
        }
        debug!(connection_id = %connection_id, "Connection removed");
    }

    async fn subscribe(&self, connection_id: &str, room_id: &str) -> bool {
        let mut registry = self.registry.write().await;
        let Some(entry) = registry.connections.get_mut(connection_id) else {
            return false;
        };
        if !entry.rooms.insert(room_id.to_string()) {
            return false;
        }

        registry
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
        true
    }

    async fn unsubscribe(&self, connection_id: &str, room_id: &str) -> bool {
        let mut registry = self.registry.write().await;
        let removed = registry
            .connections
            .get_mut(connection_id)
            .map(|entry| entry.rooms.remove(room_id))
            .unwrap_or(false);

        if let Some(subscribers) = registry.rooms.get_mut(room_id) {
            subscribers.remove(connection_id);
            if subscribers.is_empty() {
                registry.rooms.remove(room_id);
            }
        }
        removed
    }

    async fn is_subscribed(&self, connection_id: &str, room_id: &str) -> bool {
        let registry = self.registry.read().await;
        registry
            .connections
            .get(connection_id)
            .map(|entry| entry.rooms.contains(room_id))
            .unwrap_or(false)
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) -> bool {
        let registry = self.registry.read().await;
        registry.deliver(connection_id, message)
    }

    async fn send_to_room(&self, room_id: &str, message: &str, except: Option<&str>) -> usize {
        let registry = self.registry.read().await;
        let Some(subscribers) = registry.rooms.get(room_id) else {
            return 0;
        };

        subscribers
            .iter()
            .filter(|id| Some(id.as_str()) != except)
            .filter(|id| registry.deliver(id, message))
            .count()
    }

    async fn send_to_rooms(&self, room_ids: &[String], message: &str) -> usize {
        let registry = self.registry.read().await;
        let targets: HashSet<&String> = room_ids
            .iter()
            .filter_map(|room_id| registry.rooms.get(room_id))
            .flatten()
            .collect();

        targets
            .into_iter()
            .filter(|id| registry.deliver(id, message))
            .count()
    }

    async fn broadcast(&self, message: &str) -> usize {
        let registry = self.registry.read().await;
        registry
            .connections
            .values()
            .filter(|entry| entry.sender.send(message.to_string()).is_ok())
            .count()
    }

    async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }
}
