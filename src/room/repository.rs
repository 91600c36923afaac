use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::models::RoomModel;
use crate::shared::AppError;

/// Result of attempting to add a member to a room
#[derive(Debug, Clone, PartialEq)]
pub enum AddMemberResult {
    /// The user was added, returns updated room data
    Added(RoomModel),
    /// The user was already a member, the member set is unchanged
    AlreadyMember(RoomModel),
    /// Room does not exist
    RoomNotFound,
}

/// Trait for room repository operations
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError>;
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError>;

    /// All rooms, newest first
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError>;

    /// Rooms whose member set contains `user_id`
    async fn find_rooms_by_member(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError>;

    /// Atomically adds `user_id` to the member set if absent.
    /// Concurrent calls for the same pair never produce a duplicate or a lost update.
    async fn add_member(&self, room_id: &str, user_id: &str) -> Result<AddMemberResult, AppError>;
}

/// In-memory implementation of RoomRepository for development and testing
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<String, RoomModel>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        debug!(room_id = %room.id, name = %room.name, "Creating room in memory");

        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.name == room.name) {
            warn!(name = %room.name, "Room name already exists in memory");
            return Err(AppError::Conflict("Room already exists".to_string()));
        }
        if rooms.contains_key(&room.id) {
            return Err(AppError::DatabaseError("Room already exists".to_string()));
        }
        rooms.insert(room.id.clone(), room.clone());

        debug!(room_id = %room.id, "Room created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let room = self.rooms.read().await.get(room_id).cloned();

        match &room {
            Some(r) => debug!(room_id = %room_id, name = %r.name, "Room found in memory"),
            None => debug!(room_id = %room_id, "Room not found in memory"),
        }

        Ok(room)
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        let mut rooms: Vec<RoomModel> = self.rooms.read().await.values().cloned().collect();
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rooms)
    }

    #[instrument(skip(self))]
    async fn find_rooms_by_member(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError> {
        let rooms: Vec<RoomModel> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|room| room.has_member(user_id))
            .cloned()
            .collect();

        debug!(user_id = %user_id, room_count = rooms.len(), "Rooms found for member");
        Ok(rooms)
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: &str, user_id: &str) -> Result<AddMemberResult, AppError> {
        // Single write guard covers the read-modify-write
        let mut rooms = self.rooms.write().await;

        let Some(room) = rooms.get_mut(room_id) else {
            debug!(room_id = %room_id, "Room not found");
            return Ok(AddMemberResult::RoomNotFound);
        };

        if !room.add_member(user_id) {
            debug!(room_id = %room_id, user_id = %user_id, "User already a member");
            return Ok(AddMemberResult::AlreadyMember(room.clone()));
        }

        info!(
            room_id = %room_id,
            user_id = %user_id,
            member_count = room.member_count(),
            "Member added to room"
        );
        Ok(AddMemberResult::Added(room.clone()))
    }
}

/// PostgreSQL implementation of room repository
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ROOM_COLUMNS: &str = "id, name, description, is_private, created_by, members, created_at";

fn room_from_row(row: &PgRow) -> RoomModel {
    RoomModel {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        is_private: row.get("is_private"),
        created_by: row.get("created_by"),
        members: row.get("members"),
        created_at: row.get("created_at"),
    }
}

fn database_error(e: sqlx::Error, context: &str) -> AppError {
    warn!(error = %e, "{}", context);
    AppError::DatabaseError(e.to_string())
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        debug!(room_id = %room.id, name = %room.name, "Creating room in database");

        sqlx::query(
            "INSERT INTO rooms (id, name, description, is_private, created_by, members, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&room.id)
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.is_private)
        .bind(&room.created_by)
        .bind(&room.members)
        .bind(room.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Room already exists".to_string())
            }
            other => database_error(other, "Failed to create room in database"),
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error(e, "Failed to fetch room from database"))?;

        Ok(row.as_ref().map(room_from_row))
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<RoomModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to list rooms"))?;

        Ok(rows.iter().map(room_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn find_rooms_by_member(&self, user_id: &str) -> Result<Vec<RoomModel>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE $1 = ANY(members)"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to find rooms by member"))?;

        Ok(rows.iter().map(room_from_row).collect())
    }

    #[instrument(skip(self))]
    async fn add_member(&self, room_id: &str, user_id: &str) -> Result<AddMemberResult, AppError> {
        // Conditional append is a single statement, so the set-add is atomic
        let row = sqlx::query(&format!(
            "UPDATE rooms SET members = array_append(members, $2) WHERE id = $1 AND NOT ($2 = ANY(members)) RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| database_error(e, "Failed to add room member"))?;

        if let Some(row) = row {
            info!(room_id = %room_id, user_id = %user_id, "Member added to room");
            return Ok(AddMemberResult::Added(room_from_row(&row)));
        }

        match self.get_room(room_id).await? {
            Some(room) => Ok(AddMemberResult::AlreadyMember(room)),
            None => Ok(AddMemberResult::RoomNotFound),
        }
    }
}
