use std::sync::Arc;
use tracing::debug;

use crate::websockets::{
    connection_manager::ConnectionManager,
    connection_state::ConnectionState,
    messages::{ServerEvent, UserStopTypingPayload, UserTypingPayload},
};

use super::shared::{Outbound, RelayError};

/// Relays ephemeral typing indicators to the other subscribers of a room
pub struct TypingSignalRelay {
    connection_manager: Arc<dyn ConnectionManager>,
}

impl TypingSignalRelay {
    pub fn new(connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self { connection_manager }
    }

    pub async fn typing(&self, state: &mut ConnectionState, room_id: &str) -> Result<(), RelayError> {
        state.typing.insert(room_id.to_string());

        let event = ServerEvent::UserTyping(UserTypingPayload {
            user_id: state.user_id.clone(),
            username: state.username.clone(),
            room_id: room_id.to_string(),
        });
        let reached = Outbound::to_room(
            &self.connection_manager,
            room_id,
            &event,
            Some(state.connection_id.as_str()),
        )
        .await?;

        debug!(user_id = %state.user_id, room_id = %room_id, reached, "Typing relayed");
        Ok(())
    }

    pub async fn stop_typing(&self, state: &mut ConnectionState, room_id: &str) -> Result<(), RelayError> {
        state.typing.remove(room_id);
        self.announce_stop(state, room_id).await
    }

    /// Clears an outstanding indicator before the connection stops receiving the room
    pub async fn clear_room(&self, state: &mut ConnectionState, room_id: &str) -> Result<(), RelayError> {
        if state.typing.remove(room_id) {
            self.announce_stop(state, room_id).await?;
        }
        Ok(())
    }

    /// Clears every outstanding indicator of a closing connection
    pub async fn clear_all(&self, state: &mut ConnectionState) -> Result<(), RelayError> {
        for room_id in state.take_typing() {
            self.announce_stop(state, &room_id).await?;
        }
        Ok(())
    }

    async fn announce_stop(&self, state: &ConnectionState, room_id: &str) -> Result<(), RelayError> {
        let event = ServerEvent::UserStopTyping(UserStopTypingPayload {
            user_id: state.user_id.clone(),
            room_id: room_id.to_string(),
        });
        let reached = Outbound::to_room(
            &self.connection_manager,
            room_id,
            &event,
            Some(state.connection_id.as_str()),
        )
        .await?;

        debug!(user_id = %state.user_id, room_id = %room_id, reached, "Stop typing relayed");
        Ok(())
    }
}
