use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::UserModel;
use crate::shared::AppError;

/// Outcome of a compare-and-swap presence update
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceUpdate {
    /// The record was owned by the given connection and has been updated
    Applied(UserModel),
    /// A newer connection owns the record, nothing was written
    Superseded,
    /// No such user
    UserNotFound,
}

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    /// Emails are matched case-insensitively
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;

    /// Marks the user online and makes `connection_id` the owner of the presence record.
    /// Last write wins between concurrent connections of the same user.
    async fn set_online(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<UserModel>, AppError>;

    /// Marks the user offline only if `connection_id` still owns the presence record
    async fn clear_presence_if_current(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PresenceUpdate, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            warn!(username = %user.username, "Username already taken");
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            warn!(user_id = %user.id, "Email already registered");
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
        if users.contains_key(&user.id) {
            return Err(AppError::DatabaseError("User already exists".to_string()));
        }
        users.insert(user.id.clone(), user.clone());

        debug!(user_id = %user.id, username = %user.username, "User created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn set_online(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<UserModel>, AppError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user_id) else {
            debug!(user_id = %user_id, "User not found for presence update");
            return Ok(None);
        };

        if let Some(previous) = user.connection_id.as_deref() {
            debug!(
                user_id = %user_id,
                previous_connection = %previous,
                new_connection = %connection_id,
                "Superseding previous connection"
            );
        }

        user.is_online = true;
        user.connection_id = Some(connection_id.to_string());
        user.last_seen = at;
        Ok(Some(user.clone()))
    }

    #[instrument(skip(self))]
    async fn clear_presence_if_current(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PresenceUpdate, AppError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user_id) else {
            return Ok(PresenceUpdate::UserNotFound);
        };

        if user.connection_id.as_deref() != Some(connection_id) {
            return Ok(PresenceUpdate::Superseded);
        }

        user.is_online = false;
        user.connection_id = None;
        user.last_seen = at;
        Ok(PresenceUpdate::Applied(user.clone()))
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_online, connection_id, last_seen, created_at";

fn user_from_row(row: &PgRow) -> UserModel {
    UserModel {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        is_online: row.get("is_online"),
        connection_id: row.get("connection_id"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, is_online, connection_id, last_seen, created_at) VALUES ($1, $2, lower($3), $4, $5, $6, $7, $8)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_online)
        .bind(&user.connection_id)
        .bind(user.last_seen)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                match db.constraint() {
                    Some("users_email_key") => {
                        AppError::Conflict("Email already registered".to_string())
                    }
                    _ => AppError::Conflict("Username already taken".to_string()),
                }
            }
            other => {
                warn!(error = %other, "Failed to create user in database");
                AppError::DatabaseError(other.to_string())
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = %user_id, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self, email))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to look up user by email");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn set_online(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<UserModel>, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_online = TRUE, connection_id = $2, last_seen = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(connection_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to mark user online");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().map(user_from_row))
    }

    #[instrument(skip(self))]
    async fn clear_presence_if_current(
        &self,
        user_id: &str,
        connection_id: &str,
        at: DateTime<Utc>,
    ) -> Result<PresenceUpdate, AppError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_online = FALSE, connection_id = NULL, last_seen = $3 WHERE id = $1 AND connection_id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(connection_id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %user_id, "Failed to mark user offline");
            AppError::DatabaseError(e.to_string())
        })?;

        if let Some(row) = row {
            return Ok(PresenceUpdate::Applied(user_from_row(&row)));
        }

        // Nothing matched: either the user is gone or another connection owns the record
        match self.get_user(user_id).await? {
            Some(_) => Ok(PresenceUpdate::Superseded),
            None => Ok(PresenceUpdate::UserNotFound),
        }
    }
}
