// Public API - what other modules can use
pub use handlers::get_room_messages;
pub use models::{MessageKind, MessageModel, MessageView};
pub use repository::{InMemoryMessageRepository, MessageRepository, PostgresMessageRepository};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
