// Library crate for the chat relay server
// This file exposes the public API for the binary and integration tests

pub mod auth;
pub mod config;
pub mod message;
pub mod room;
pub mod routes;
pub mod shared;
pub mod store;
pub mod user;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::{AppConfig, PresenceScope};
pub use routes::build_router;
pub use shared::{AppError, AppState};
pub use store::Store;
pub use websockets::{
    ClientEvent, ConnectionManager, EventRouter, InMemoryConnectionManager, MessageHandler,
    RelayServices, ServerEvent,
};
