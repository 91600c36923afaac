use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PresenceScope,
    user::{PresenceUpdate, UserModel, UserRepository},
    websockets::{
        connection_manager::ConnectionManager, connection_state::ConnectionState,
        messages::ServerEvent,
    },
};

use super::shared::{Outbound, RelayError};

/// Tracks which connection owns each user's online status and announces transitions
pub struct PresenceTracker {
    user_repository: Arc<dyn UserRepository>,
    connection_manager: Arc<dyn ConnectionManager>,
    scope: PresenceScope,
}

impl PresenceTracker {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        connection_manager: Arc<dyn ConnectionManager>,
        scope: PresenceScope,
    ) -> Self {
        Self {
            user_repository,
            connection_manager,
            scope,
        }
    }

    /// Claims the presence record for this connection and announces the user online
    #[instrument(skip(self, state), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn connect(&self, state: &ConnectionState) -> Result<UserModel, RelayError> {
        let user = self
            .user_repository
            .set_online(&state.user_id, &state.connection_id, Utc::now())
            .await?
            .ok_or_else(|| RelayError::UserNotFound(state.user_id.clone()))?;

        let event = ServerEvent::user_status(&user.id, &user.username, true);
        let reached = self.announce(state, &event).await?;

        info!(username = %user.username, reached, "User online");
        Ok(user)
    }

    /// Releases the presence record if this connection still owns it.
    ///
    /// Returns true when the user went offline; a superseded connection changes nothing.
    #[instrument(skip(self, state), fields(user_id = %state.user_id, connection_id = %state.connection_id))]
    pub async fn disconnect(&self, state: &ConnectionState) -> Result<bool, RelayError> {
        let update = self
            .user_repository
            .clear_presence_if_current(&state.user_id, &state.connection_id, Utc::now())
            .await?;

        match update {
            PresenceUpdate::Applied(user) => {
                let event = ServerEvent::user_status(&user.id, &user.username, false);
                let reached = self.announce(state, &event).await?;

                info!(username = %user.username, reached, "User offline");
                Ok(true)
            }
            PresenceUpdate::Superseded => {
                debug!("Disconnect from superseded connection, presence untouched");
                Ok(false)
            }
            PresenceUpdate::UserNotFound => {
                warn!("User vanished before disconnect");
                Ok(false)
            }
        }
    }

    async fn announce(&self, state: &ConnectionState, event: &ServerEvent) -> Result<usize, RelayError> {
        match self.scope {
            PresenceScope::Global => Outbound::to_all(&self.connection_manager, event).await,
            PresenceScope::SharedRooms => {
                let rooms: Vec<String> = state.subscriptions.iter().cloned().collect();
                Outbound::to_rooms(&self.connection_manager, &rooms, event).await
            }
        }
    }
}
