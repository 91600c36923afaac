pub mod chat_events;
pub mod presence_events;
pub mod room_events;
pub mod shared;
pub mod typing_events;

pub use chat_events::MessageBroadcaster;
pub use presence_events::PresenceTracker;
pub use room_events::RoomMembershipManager;
pub use shared::RelayError;
pub use typing_events::TypingSignalRelay;

use std::sync::Arc;

use crate::{config::PresenceScope, store::Store};

use super::connection_manager::ConnectionManager;

/// The relay components, wired to one store and one connection registry
#[derive(Clone)]
pub struct RelayServices {
    pub presence: Arc<PresenceTracker>,
    pub membership: Arc<RoomMembershipManager>,
    pub broadcaster: Arc<MessageBroadcaster>,
    pub typing: Arc<TypingSignalRelay>,
}

impl RelayServices {
    pub fn new(
        store: &Store,
        connection_manager: Arc<dyn ConnectionManager>,
        presence_scope: PresenceScope,
    ) -> Self {
        Self {
            presence: Arc::new(PresenceTracker::new(
                store.users.clone(),
                connection_manager.clone(),
                presence_scope,
            )),
            membership: Arc::new(RoomMembershipManager::new(
                store.rooms.clone(),
                connection_manager.clone(),
            )),
            broadcaster: Arc::new(MessageBroadcaster::new(
                store.messages.clone(),
                connection_manager.clone(),
            )),
            typing: Arc::new(TypingSignalRelay::new(connection_manager)),
        }
    }
}
