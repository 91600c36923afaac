// Public API
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use connection_state::{ConnectionPhase, ConnectionState, InvalidTransition, PhaseEvent};
pub use event_handlers::{
    MessageBroadcaster, PresenceTracker, RelayError, RelayServices, RoomMembershipManager,
    TypingSignalRelay,
};
pub use handler::{serve_connection, websocket_handler, EventRouter};
pub use messages::{ClientEvent, ServerEvent};
pub use socket::{MessageHandler, SocketError, SocketWrapper};

// Internal modules
mod connection_manager;
mod connection_state;
pub mod event_handlers;
mod handler;
pub mod messages;
mod socket;
