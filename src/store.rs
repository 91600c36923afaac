use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

use crate::message::{InMemoryMessageRepository, MessageRepository, PostgresMessageRepository};
use crate::room::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository};
use crate::shared::AppError;
use crate::user::{InMemoryUserRepository, PostgresUserRepository, UserRepository};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_online BOOLEAN NOT NULL DEFAULT FALSE,
        connection_id TEXT,
        last_seen TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        is_private BOOLEAN NOT NULL DEFAULT FALSE,
        created_by TEXT NOT NULL REFERENCES users(id),
        members TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        content TEXT NOT NULL CHECK (length(content) > 0),
        sender_id TEXT NOT NULL REFERENCES users(id),
        room_id TEXT NOT NULL REFERENCES rooms(id),
        message_type TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_room_created_idx ON messages (room_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS rooms_members_idx ON rooms USING GIN (members)",
];

/// The persistent store collaborators, bundled for wiring
#[derive(Clone)]
pub struct Store {
    pub users: Arc<dyn UserRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Store {
    /// Volatile store for development and tests; data is lost on restart
    pub fn in_memory() -> Self {
        Self::in_memory_over(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryRoomRepository::new()),
        )
    }

    /// In-memory messages whose references are checked against the given user and room stores
    pub fn in_memory_over(users: Arc<dyn UserRepository>, rooms: Arc<dyn RoomRepository>) -> Self {
        let messages = Arc::new(InMemoryMessageRepository::new(users.clone(), rooms.clone()));

        Self {
            users,
            rooms,
            messages,
        }
    }

    /// Connects to PostgreSQL and makes sure the tables exist
    pub async fn postgres(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to connect to database");
                AppError::DatabaseError(e.to_string())
            })?;

        ensure_schema(&pool).await?;
        info!("Connected to PostgreSQL");

        Ok(Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            rooms: Arc::new(PostgresRoomRepository::new(pool.clone())),
            messages: Arc::new(PostgresMessageRepository::new(pool)),
        })
    }
}

async fn ensure_schema(pool: &PgPool) -> Result<(), AppError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            warn!(error = %e, "Failed to apply schema");
            AppError::DatabaseError(e.to_string())
        })?;
    }
    Ok(())
}
