#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use chat_relay::{
    message::{MessageModel, MessageRepository, MessageView},
    room::{models::RoomModel, AddMemberResult, InMemoryRoomRepository, RoomRepository},
    websockets::{SocketError, SocketWrapper},
    AppError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Socket backed by channels: the test plays the client on the other ends.
/// Dropping the client's sender looks like the client closing the socket.
pub struct ChannelSocket {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

impl ChannelSocket {
    pub fn pair() -> (
        Self,
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        (Self { inbound, outbound }, to_server, from_server)
    }
}

#[async_trait]
impl SocketWrapper for ChannelSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.outbound
            .send(message)
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        Ok(self.inbound.recv().await)
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        Ok(())
    }
}

/// Message store whose writes always fail
pub struct FailingMessageRepository;

#[async_trait]
impl MessageRepository for FailingMessageRepository {
    async fn create_message(&self, _message: &MessageModel) -> Result<MessageView, AppError> {
        Err(AppError::DatabaseError("connection reset".to_string()))
    }

    async fn recent_messages(
        &self,
        _room_id: &str,
        _limit: usize,
    ) -> Result<Vec<MessageView>, AppError> {
        Ok(vec![])
    }
}

/// Room store that delegates to memory but fails membership writes
pub struct FailingMembershipRoomRepository {
    inner: Arc<InMemoryRoomRepository>,
}

impl FailingMembershipRoomRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryRoomRepository::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for FailingMembershipRoomRepository {
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        self.inner.create_room(room).await
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        self.inner.get_room(room_id).await
    }

    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        self.inner.list_rooms().await
    }

    async fn find_rooms_by_member(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError> {
        self.inner.find_rooms_by_member(user_id).await
    }

    async fn add_member(&self, _room_id: &str, _user_id: &str) -> Result<AddMemberResult, AppError> {
        Err(AppError::DatabaseError("connection reset".to_string()))
    }
}
