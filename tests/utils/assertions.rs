//! Test assertion helpers - verify what a client received
#![allow(dead_code)] // Test utilities may not all be used in every test

use chat_relay::message::MessageView;
use chat_relay::websockets::messages::UserStatusPayload;
use chat_relay::ServerEvent;

use super::setup::TestClient;

// ============================================================================
// Assertion Helpers
// ============================================================================

impl TestClient {
    /// Everything received so far (consumes the queue)
    pub fn events(&mut self) -> Vec<ServerEvent> {
        let mut events = vec![];
        while let Ok(frame) = self.from_server.try_recv() {
            let event = serde_json::from_str(&frame)
                .unwrap_or_else(|e| panic!("unparseable frame {frame}: {e}"));
            events.push(event);
        }
        events
    }

    pub fn received_nothing(&mut self) {
        let events = self.events();
        assert!(
            events.is_empty(),
            "{} should not have received anything, got {:?}",
            self.user.username,
            events
        );
    }

    /// Asserts exactly one event was queued and returns it
    pub fn received_one(&mut self) -> ServerEvent {
        let mut events = self.events();
        assert_eq!(
            events.len(),
            1,
            "{} should have received exactly one event, got {:?}",
            self.user.username,
            events
        );
        events.remove(0)
    }

    pub fn received_message(&mut self) -> MessageView {
        match self.received_one() {
            ServerEvent::NewMessage(view) => view,
            other => panic!("{} expected newMessage, got {:?}", self.user.username, other),
        }
    }

    /// Presence notifications received, in order
    pub fn status_changes(&mut self) -> Vec<UserStatusPayload> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ServerEvent::UserStatusChange(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }
}

/// Shorthand for comparing presence notifications
pub fn status(user_id: &str, username: &str, is_online: bool) -> UserStatusPayload {
    UserStatusPayload {
        user_id: user_id.to_string(),
        username: username.to_string(),
        is_online,
    }
}
