// Public API - what other modules can use
pub use models::{AccountView, UserModel, UserProfile};
pub use repository::{InMemoryUserRepository, PostgresUserRepository, PresenceUpdate, UserRepository};

// Internal modules
pub mod models;
pub mod repository;
