use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::{
    message::{MessageModel, MessageRepository},
    shared::AppError,
    websockets::{
        connection_manager::ConnectionManager, connection_state::ConnectionState,
        messages::ServerEvent,
    },
};

use super::shared::{Outbound, RelayError};

/// Persists chat messages and fans them out to the room's subscribers
pub struct MessageBroadcaster {
    message_repository: Arc<dyn MessageRepository>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl MessageBroadcaster {
    pub fn new(
        message_repository: Arc<dyn MessageRepository>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            message_repository,
            connection_manager,
        }
    }

    /// Broadcasts only after the store accepted the message, sender included.
    /// Failures are reported to the sender alone.
    #[instrument(skip(self, state, content), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn send(
        &self,
        state: &ConnectionState,
        room_id: &str,
        content: &str,
    ) -> Result<(), RelayError> {
        if content.trim().is_empty() {
            warn!(room_id = %room_id, "Rejected empty message");
            return self
                .reject(state, "Message content cannot be empty")
                .await;
        }

        let message = MessageModel::text(
            state.user_id.clone(),
            room_id.to_string(),
            content.to_string(),
        );

        let view = match self.message_repository.create_message(&message).await {
            Ok(view) => view,
            Err(AppError::NotFound(what)) => {
                warn!(room_id = %room_id, reason = %what, "Message target missing");
                return self.reject(state, what).await;
            }
            Err(e) => {
                error!(room_id = %room_id, error = %e, "Failed to persist message");
                return self.reject(state, "Failed to send message").await;
            }
        };

        let reached = Outbound::to_room(
            &self.connection_manager,
            room_id,
            &ServerEvent::NewMessage(view),
            None,
        )
        .await?;

        info!(room_id = %room_id, message_id = %message.id, reached, "Message broadcast");
        Ok(())
    }

    async fn reject(&self, state: &ConnectionState, reason: impl Into<String>) -> Result<(), RelayError> {
        Outbound::to_connection(
            &self.connection_manager,
            &state.connection_id,
            &ServerEvent::message_error(reason),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageView;
    use crate::room::{models::RoomModel, RoomRepository};
    use crate::store::Store;
    use crate::shared::test_utils::test_user;
    use crate::user::UserRepository;
    use crate::websockets::connection_manager::InMemoryConnectionManager;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct FailingMessageRepository;

    #[async_trait]
    impl MessageRepository for FailingMessageRepository {
        async fn create_message(&self, _message: &MessageModel) -> Result<MessageView, AppError> {
            Err(AppError::DatabaseError("down".into()))
        }
        async fn recent_messages(
            &self,
            _room_id: &str,
            _limit: usize,
        ) -> Result<Vec<MessageView>, AppError> {
            Err(AppError::DatabaseError("down".into()))
        }
    }

    struct Fixture {
        store: Store,
        manager: Arc<InMemoryConnectionManager>,
        sender: ConnectionState,
        room_id: String,
        sender_rx: mpsc::UnboundedReceiver<String>,
        other_rx: mpsc::UnboundedReceiver<String>,
    }

    async fn fixture() -> Fixture {
        let store = Store::in_memory();
        let alice = test_user("alice");
        let bob = test_user("bob");
        store.users.create_user(&alice).await.unwrap();
        store.users.create_user(&bob).await.unwrap();
        let room = RoomModel::new("general".into(), String::new(), false, alice.id.clone());
        store.rooms.create_room(&room).await.unwrap();

        let manager = Arc::new(InMemoryConnectionManager::new());
        let (tx1, sender_rx) = mpsc::unbounded_channel();
        let (tx2, other_rx) = mpsc::unbounded_channel();
        manager.add_connection("c1".into(), alice.id.clone(), tx1).await;
        manager.add_connection("c2".into(), bob.id.clone(), tx2).await;
        manager.subscribe("c1", &room.id).await;
        manager.subscribe("c2", &room.id).await;

        Fixture {
            store,
            manager,
            sender: ConnectionState::new("c1".into(), alice.id, alice.username),
            room_id: room.id,
            sender_rx,
            other_rx,
        }
    }

    fn events(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<ServerEvent> {
        let mut out = vec![];
        while let Ok(msg) = rx.try_recv() {
            out.push(serde_json::from_str(&msg).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_send_persists_and_broadcasts_to_all_subscribers() {
        let mut fx = fixture().await;
        let broadcaster = MessageBroadcaster::new(fx.store.messages.clone(), fx.manager.clone());

        broadcaster
            .send(&fx.sender, &fx.room_id, "  hello\n  world  ")
            .await
            .unwrap();

        for rx in [&mut fx.sender_rx, &mut fx.other_rx] {
            let received = events(rx);
            assert_eq!(received.len(), 1);
            let ServerEvent::NewMessage(view) = &received[0] else {
                panic!("expected newMessage, got {:?}", received[0]);
            };
            assert_eq!(view.content, "  hello\n  world  ");
            assert_eq!(view.sender.username, "alice");
            assert_eq!(view.room, fx.room_id);
        }

        let history = fx.store.messages.recent_messages(&fx.room_id, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "  hello\n  world  ");
    }

    #[tokio::test]
    async fn test_blank_content_is_rejected_privately() {
        let mut fx = fixture().await;
        let broadcaster = MessageBroadcaster::new(fx.store.messages.clone(), fx.manager.clone());

        broadcaster.send(&fx.sender, &fx.room_id, "   ").await.unwrap();

        assert!(matches!(
            events(&mut fx.sender_rx).as_slice(),
            [ServerEvent::MessageError(_)]
        ));
        assert!(events(&mut fx.other_rx).is_empty());
        assert!(fx
            .store
            .messages
            .recent_messages(&fx.room_id, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_sends_message_error_only_to_sender() {
        let mut fx = fixture().await;
        let broadcaster = MessageBroadcaster::new(Arc::new(FailingMessageRepository), fx.manager.clone());

        broadcaster.send(&fx.sender, &fx.room_id, "hello").await.unwrap();

        assert_eq!(
            events(&mut fx.sender_rx),
            vec![ServerEvent::message_error("Failed to send message")]
        );
        assert!(events(&mut fx.other_rx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_room_is_reported() {
        let mut fx = fixture().await;
        let broadcaster = MessageBroadcaster::new(fx.store.messages.clone(), fx.manager.clone());

        broadcaster.send(&fx.sender, "nowhere", "hello").await.unwrap();

        assert_eq!(
            events(&mut fx.sender_rx),
            vec![ServerEvent::message_error("Room not found")]
        );
    }
}
