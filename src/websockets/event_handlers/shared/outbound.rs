use std::sync::Arc;
use tracing::debug;

use super::RelayError;
use crate::websockets::{connection_manager::ConnectionManager, messages::ServerEvent};

/// Serializes server events and hands them to the ConnectionManager
pub struct Outbound;

impl Outbound {
    pub async fn to_connection(
        connection_manager: &Arc<dyn ConnectionManager>,
        connection_id: &str,
        event: &ServerEvent,
    ) -> Result<(), RelayError> {
        let message_json = event.to_json()?;
        if !connection_manager
            .send_to_connection(connection_id, &message_json)
            .await
        {
            debug!(connection_id = %connection_id, "Connection gone, event dropped");
        }
        Ok(())
    }

    pub async fn to_room(
        connection_manager: &Arc<dyn ConnectionManager>,
        room_id: &str,
        event: &ServerEvent,
        except: Option<&str>,
    ) -> Result<usize, RelayError> {
        let message_json = event.to_json()?;
        Ok(connection_manager
            .send_to_room(room_id, &message_json, except)
            .await)
    }

    pub async fn to_rooms(
        connection_manager: &Arc<dyn ConnectionManager>,
        room_ids: &[String],
        event: &ServerEvent,
    ) -> Result<usize, RelayError> {
        let message_json = event.to_json()?;
        Ok(connection_manager.send_to_rooms(room_ids, &message_json).await)
    }

    pub async fn to_all(
        connection_manager: &Arc<dyn ConnectionManager>,
        event: &ServerEvent,
    ) -> Result<usize, RelayError> {
        let message_json = event.to_json()?;
        Ok(connection_manager.broadcast(&message_json).await)
    }
}
