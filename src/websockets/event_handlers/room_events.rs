use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    room::{AddMemberResult, RoomRepository},
    websockets::{
        connection_manager::ConnectionManager, connection_state::ConnectionState,
        messages::ServerEvent,
    },
};

use super::shared::{Outbound, RelayError};

/// Keeps a connection's live room subscriptions in step with persisted membership
pub struct RoomMembershipManager {
    room_repository: Arc<dyn RoomRepository>,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl RoomMembershipManager {
    pub fn new(
        room_repository: Arc<dyn RoomRepository>,
        connection_manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            room_repository,
            connection_manager,
        }
    }

    /// Subscribes a fresh connection to every room its user belongs to. Read-only on the store.
    #[instrument(skip(self, state), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn sync_on_connect(&self, state: &mut ConnectionState) -> Result<Vec<String>, RelayError> {
        let rooms = self
            .room_repository
            .find_rooms_by_member(&state.user_id)
            .await?;

        let mut room_ids = Vec::with_capacity(rooms.len());
        for room in rooms {
            self.connection_manager
                .subscribe(&state.connection_id, &room.id)
                .await;
            state.subscriptions.insert(room.id.clone());
            room_ids.push(room.id);
        }

        debug!(rooms = room_ids.len(), "Subscribed to member rooms");
        Ok(room_ids)
    }

    /// Subscribes first, then records membership.
    ///
    /// An unknown room rolls the subscription back; a store failure keeps it live.
    #[instrument(skip(self, state), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn join(&self, state: &mut ConnectionState, room_id: &str) -> Result<(), RelayError> {
        self.connection_manager
            .subscribe(&state.connection_id, room_id)
            .await;
        state.subscriptions.insert(room_id.to_string());

        match self.room_repository.add_member(room_id, &state.user_id).await {
            Ok(AddMemberResult::Added(room)) => {
                info!(room_id = %room_id, members = room.member_count(), "User joined room");
            }
            Ok(AddMemberResult::AlreadyMember(_)) => {
                debug!(room_id = %room_id, "User already a member");
            }
            Ok(AddMemberResult::RoomNotFound) => {
                warn!(room_id = %room_id, "Join for unknown room, rolling back subscription");
                self.connection_manager
                    .unsubscribe(&state.connection_id, room_id)
                    .await;
                state.subscriptions.remove(room_id);

                let event = ServerEvent::room_error(room_id, "Room not found");
                return Outbound::to_connection(&self.connection_manager, &state.connection_id, &event)
                    .await;
            }
            Err(e) => {
                error!(room_id = %room_id, error = %e, "Failed to persist room membership");
                self.ack(state, ServerEvent::JoinedRoom(room_id.to_string()))
                    .await?;

                let event = ServerEvent::room_error(room_id, "Failed to save room membership");
                return Outbound::to_connection(&self.connection_manager, &state.connection_id, &event)
                    .await;
            }
        }

        self.ack(state, ServerEvent::JoinedRoom(room_id.to_string()))
            .await
    }

    /// Stops delivery for the room on this connection. Persisted membership is kept.
    #[instrument(skip(self, state), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn leave(&self, state: &mut ConnectionState, room_id: &str) -> Result<(), RelayError> {
        let was_subscribed = self
            .connection_manager
            .unsubscribe(&state.connection_id, room_id)
            .await;
        state.subscriptions.remove(room_id);

        debug!(room_id = %room_id, was_subscribed, "Left room channel");
        self.ack(state, ServerEvent::LeftRoom(room_id.to_string()))
            .await
    }

    async fn ack(&self, state: &ConnectionState, event: ServerEvent) -> Result<(), RelayError> {
        Outbound::to_connection(&self.connection_manager, &state.connection_id, &event).await
    }
}
