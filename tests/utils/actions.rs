//! Client-side actions - each sends one frame and lets the relay process it
#![allow(dead_code)] // Test utilities may not all be used in every test

use std::time::Duration;

use chat_relay::websockets::messages::{RoomPayload, SendMessagePayload};
use chat_relay::ClientEvent;

use super::setup::{settle, TestClient};

impl TestClient {
    pub async fn send_raw(&self, frame: &str) {
        self.to_server
            .send(frame.to_string())
            .expect("connection task should be running");
        settle().await;
    }

    pub async fn send_event(&self, event: ClientEvent) {
        let frame = serde_json::to_string(&event).unwrap();
        self.send_raw(&frame).await;
    }

    pub async fn join_room(&self, room_id: &str) {
        self.send_event(ClientEvent::JoinRoom(room(room_id))).await;
    }

    pub async fn leave_room(&self, room_id: &str) {
        self.send_event(ClientEvent::LeaveRoom(room(room_id))).await;
    }

    pub async fn send_message(&self, room_id: &str, content: &str) {
        self.send_event(ClientEvent::SendMessage(SendMessagePayload {
            content: content.to_string(),
            room_id: room_id.to_string(),
        }))
        .await;
    }

    pub async fn typing(&self, room_id: &str) {
        self.send_event(ClientEvent::Typing(room(room_id))).await;
    }

    pub async fn stop_typing(&self, room_id: &str) {
        self.send_event(ClientEvent::StopTyping(room(room_id))).await;
    }

    /// Closes the client side and waits for the relay to finish its cleanup
    pub async fn disconnect(self) {
        let TestClient { to_server, task, .. } = self;
        drop(to_server);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("connection should shut down")
            .expect("connection task should not panic");
        settle().await;
    }
}

fn room(room_id: &str) -> RoomPayload {
    RoomPayload {
        room_id: room_id.to_string(),
    }
}
