#![allow(dead_code)] // Test utilities may not all be used in every test

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chat_relay::{
    message::MessageRepository,
    room::{models::RoomModel, RoomRepository},
    shared::test_utils::{test_user, AppStateBuilder},
    user::{UserModel, UserRepository},
    websockets::serve_connection,
    AppState, PresenceScope, Store,
};

use super::mocks::ChannelSocket;

/// Lets spawned connection tasks run until they are idle again
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(25)).await;
}

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub store: Store,
    users: HashMap<String, UserModel>,
    rooms: HashMap<String, String>,
}

/// One simulated client with a live connection through the real relay
pub struct TestClient {
    pub user: UserModel,
    pub(super) to_server: mpsc::UnboundedSender<String>,
    pub(super) from_server: mpsc::UnboundedReceiver<String>,
    pub(super) task: JoinHandle<()>,
}

impl TestSetup {
    pub fn user(&self, username: &str) -> &UserModel {
        self.users
            .get(username)
            .unwrap_or_else(|| panic!("unknown test user {username}"))
    }

    pub fn room_id(&self, name: &str) -> String {
        self.rooms
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("unknown test room {name}"))
    }

    /// Opens a connection for an already authenticated user and waits for the
    /// connect sequence (subscriptions, presence) to finish
    pub async fn connect(&self, username: &str) -> TestClient {
        let user = self.user(username).clone();
        let (socket, to_server, from_server) = ChannelSocket::pair();

        let task = tokio::spawn(serve_connection(
            Box::new(socket),
            user.clone(),
            self.state.clone(),
        ));
        settle().await;

        TestClient {
            user,
            to_server,
            from_server,
            task,
        }
    }

    pub async fn stored_user(&self, username: &str) -> UserModel {
        self.store
            .users
            .get_user(&self.user(username).id)
            .await
            .unwrap()
            .expect("user should exist")
    }

    pub async fn stored_room(&self, name: &str) -> RoomModel {
        self.store
            .rooms
            .get_room(&self.room_id(name))
            .await
            .unwrap()
            .expect("room should exist")
    }
}

pub struct TestSetupBuilder {
    builder: AppStateBuilder,
    users: Vec<String>,
    rooms: Vec<(String, Vec<String>)>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            builder: AppStateBuilder::new(),
            users: vec![],
            rooms: vec![],
        }
    }

    pub fn with_users(mut self, users: Vec<&str>) -> Self {
        self.users = users.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_alice_and_bob(self) -> Self {
        self.with_users(vec!["alice", "bob"])
    }

    /// Adds a room; the first member is its creator
    pub fn with_room(mut self, name: &str, members: Vec<&str>) -> Self {
        self.rooms.push((
            name.to_string(),
            members.into_iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn with_presence_scope(mut self, scope: PresenceScope) -> Self {
        self.builder = self.builder.with_presence_scope(scope);
        self
    }

    pub fn with_room_repository(mut self, repo: Arc<dyn RoomRepository>) -> Self {
        self.builder = self.builder.with_room_repository(repo);
        self
    }

    pub fn with_message_repository(mut self, repo: Arc<dyn MessageRepository>) -> Self {
        self.builder = self.builder.with_message_repository(repo);
        self
    }

    pub async fn build(self) -> TestSetup {
        let store = self.builder.store();

        let mut users = HashMap::new();
        for username in &self.users {
            let user = test_user(username);
            store.users.create_user(&user).await.unwrap();
            users.insert(username.clone(), user);
        }

        let mut rooms = HashMap::new();
        for (name, members) in &self.rooms {
            let creator = &users[&members[0]];
            let mut room = RoomModel::new(name.clone(), String::new(), false, creator.id.clone());
            for member in &members[1..] {
                room.add_member(&users[member].id);
            }
            store.rooms.create_room(&room).await.unwrap();
            rooms.insert(name.clone(), room.id);
        }

        TestSetup {
            state: self.builder.build(),
            store,
            users,
            rooms,
        }
    }
}
