use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{MessageKind, MessageModel, MessageView};
use crate::room::RoomRepository;
use crate::shared::AppError;
use crate::user::{UserProfile, UserRepository};

/// Trait for message repository operations
///
/// The repository owns the sender join, so callers only ever see `MessageView`s.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persists the message and returns it with the sender profile attached.
    /// Fails with `NotFound` when the room or the sender does not exist.
    async fn create_message(&self, message: &MessageModel) -> Result<MessageView, AppError>;

    /// The latest `limit` messages of a room, oldest first
    async fn recent_messages(&self, room_id: &str, limit: usize)
        -> Result<Vec<MessageView>, AppError>;
}

/// In-memory implementation of MessageRepository for development and testing
///
/// Goes through the user and room repositories to enforce references and join profiles.
pub struct InMemoryMessageRepository {
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn RoomRepository>,
    messages: RwLock<Vec<MessageModel>>,
}

impl InMemoryMessageRepository {
    pub fn new(users: Arc<dyn UserRepository>, rooms: Arc<dyn RoomRepository>) -> Self {
        Self {
            users,
            rooms,
            messages: RwLock::new(Vec::new()),
        }
    }

    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.get_user(user_id).await?.map(|u| u.profile()))
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<MessageView, AppError> {
        if self.rooms.get_room(&message.room_id).await?.is_none() {
            debug!(room_id = %message.room_id, "Message references unknown room");
            return Err(AppError::NotFound("Room not found".to_string()));
        }
        let sender = self.profile(&message.sender_id).await?.ok_or_else(|| {
            debug!(sender_id = %message.sender_id, "Message references unknown sender");
            AppError::NotFound("Sender not found".to_string())
        })?;

        self.messages.write().await.push(message.clone());

        debug!(
            message_id = %message.id,
            room_id = %message.room_id,
            "Message stored in memory"
        );
        Ok(MessageView::new(message.clone(), sender))
    }

    #[instrument(skip(self))]
    async fn recent_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageView>, AppError> {
        let latest: Vec<MessageModel> = {
            let messages = self.messages.read().await;
            let in_room: Vec<&MessageModel> =
                messages.iter().filter(|m| m.room_id == room_id).collect();
            let skip = in_room.len().saturating_sub(limit);
            in_room.into_iter().skip(skip).cloned().collect()
        };

        let mut views = Vec::with_capacity(latest.len());
        for message in latest {
            match self.profile(&message.sender_id).await? {
                Some(sender) => views.push(MessageView::new(message, sender)),
                None => warn!(message_id = %message.id, "Dropping message with unknown sender"),
            }
        }
        Ok(views)
    }
}

/// PostgreSQL implementation of message repository
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const VIEW_SELECT: &str = "SELECT m.id, m.content, m.sender_id, m.room_id, m.message_type, m.created_at, u.username, u.is_online FROM messages m JOIN users u ON u.id = m.sender_id";

fn view_from_row(row: &PgRow) -> Result<MessageView, AppError> {
    let kind: String = row.get("message_type");
    let kind = MessageKind::from_str(&kind)
        .map_err(|e| AppError::DatabaseError(format!("Invalid message type {kind}: {e}")))?;

    let sender_id: String = row.get("sender_id");
    Ok(MessageView {
        id: row.get("id"),
        content: row.get("content"),
        sender: UserProfile {
            id: sender_id,
            username: row.get("username"),
            is_online: row.get("is_online"),
        },
        room: row.get("room_id"),
        message_type: kind,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    #[instrument(skip(self, message))]
    async fn create_message(&self, message: &MessageModel) -> Result<MessageView, AppError> {
        sqlx::query(
            "INSERT INTO messages (id, content, sender_id, room_id, message_type, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.id)
        .bind(&message.content)
        .bind(&message.sender_id)
        .bind(&message.room_id)
        .bind(message.kind.as_ref())
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Room or sender not found".to_string())
            }
            other => {
                warn!(error = %other, "Failed to insert message");
                AppError::DatabaseError(other.to_string())
            }
        })?;

        let row = sqlx::query(&format!("{VIEW_SELECT} WHERE m.id = $1"))
            .bind(&message.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, message_id = %message.id, "Failed to load stored message");
                AppError::DatabaseError(e.to_string())
            })?;

        view_from_row(&row)
    }

    #[instrument(skip(self))]
    async fn recent_messages(
        &self,
        room_id: &str,
        limit: usize,
    ) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query(&format!(
            "{VIEW_SELECT} WHERE m.room_id = $1 ORDER BY m.created_at DESC LIMIT $2"
        ))
        .bind(room_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, room_id = %room_id, "Failed to fetch room messages");
            AppError::DatabaseError(e.to_string())
        })?;

        let mut views = rows
            .iter()
            .map(view_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        views.reverse();
        Ok(views)
    }
}
