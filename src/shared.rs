use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{ConnectionAuthenticator, TokenConfig};
use crate::config::AppConfig;
use crate::message::MessageRepository;
use crate::room::RoomRepository;
use crate::store::Store;
use crate::user::UserRepository;
use crate::websockets::{ConnectionManager, EventRouter, InMemoryConnectionManager, RelayServices};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub token_config: Arc<TokenConfig>,
    pub authenticator: ConnectionAuthenticator,
    pub user_repository: Arc<dyn UserRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub connection_manager: Arc<dyn ConnectionManager>,
    pub relay: RelayServices,
    /// Shared by every connection's dispatch loop
    pub router: Arc<EventRouter>,
    pub history_limit: usize,
    pub password_cost: u32,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Store) -> Self {
        let token_config = Arc::new(TokenConfig::from_config(config));
        let connection_manager: Arc<dyn ConnectionManager> =
            Arc::new(InMemoryConnectionManager::new());
        let relay = RelayServices::new(&store, connection_manager.clone(), config.presence_scope);
        let router = Arc::new(EventRouter::new(relay.clone(), connection_manager.clone()));

        Self {
            authenticator: ConnectionAuthenticator::new(token_config.clone()),
            token_config,
            user_repository: store.users,
            room_repository: store.rooms,
            message_repository: store.messages,
            connection_manager,
            relay,
            router,
            history_limit: config.history_limit,
            password_cost: config.password_cost,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use crate::config::PresenceScope;
    use crate::user::UserModel;

    pub const TEST_SECRET: &str = "test-secret";

    /// Lowest cost bcrypt accepts, keeps registration fast in tests
    pub const TEST_PASSWORD_COST: u32 = 4;

    /// A seeded user with a derived email. The hash matches no password, so it can't log in.
    pub fn test_user(username: &str) -> UserModel {
        UserModel::new(
            username.to_string(),
            format!("{username}@example.com"),
            "!".to_string(),
        )
    }

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        config: AppConfig,
        store: Store,
        custom_messages: bool,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            let mut config = AppConfig::default();
            config.jwt_secret = TEST_SECRET.to_string();
            config.password_cost = TEST_PASSWORD_COST;

            Self {
                config,
                store: Store::in_memory(),
                custom_messages: false,
            }
        }

        pub fn with_user_repository(mut self, repo: Arc<dyn UserRepository>) -> Self {
            self.store.users = repo;
            self.relink_messages();
            self
        }

        pub fn with_room_repository(mut self, repo: Arc<dyn RoomRepository>) -> Self {
            self.store.rooms = repo;
            self.relink_messages();
            self
        }

        pub fn with_message_repository(mut self, repo: Arc<dyn MessageRepository>) -> Self {
            self.store.messages = repo;
            self.custom_messages = true;
            self
        }

        pub fn with_presence_scope(mut self, scope: PresenceScope) -> Self {
            self.config.presence_scope = scope;
            self
        }

        pub fn with_history_limit(mut self, limit: usize) -> Self {
            self.config.history_limit = limit;
            self
        }

        /// Handles to the repositories the built state will use, for seeding
        pub fn store(&self) -> Store {
            self.store.clone()
        }

        /// A token config sharing the built state's secret
        pub fn token_config(&self) -> TokenConfig {
            TokenConfig::from_config(&self.config)
        }

        pub fn build(self) -> AppState {
            AppState::new(&self.config, self.store)
        }

        // The default message store must see the same users and rooms as the relay
        fn relink_messages(&mut self) {
            if !self.custom_messages {
                self.store =
                    Store::in_memory_over(self.store.users.clone(), self.store.rooms.clone());
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
