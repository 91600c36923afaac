use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct UserModel {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_online: bool,
    pub connection_id: Option<String>, // Set only while a live connection owns the presence record
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates an offline user with a generated ID
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            is_online: false,
            connection_id: None,
            last_seen: now,
            created_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            is_online: self.is_online,
        }
    }
}

/// The signed-in user's own account, as returned by login and `/api/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl From<&UserModel> for AccountView {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            is_online: user.is_online,
            last_seen: user.last_seen,
        }
    }
}

/// Public fields of a user that may be attached to messages and events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub is_online: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserModel {
        UserModel::new(
            "alice".to_string(),
            "alice@example.com".to_string(),
            "$2b$04$hash".to_string(),
        )
    }

    #[test]
    fn test_new_user_is_offline() {
        let user = alice();
        assert!(!user.id.is_empty());
        assert!(!user.is_online);
        assert!(user.connection_id.is_none());
    }

    #[test]
    fn test_profile_serializes_camel_case() {
        let mut user = alice();
        user.is_online = true;

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["isOnline"], true);
        assert!(json.get("connection_id").is_none());
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = alice();

        let model = serde_json::to_value(&user).unwrap();
        assert!(model.get("password_hash").is_none());
        assert_eq!(model["email"], "alice@example.com");

        let account = serde_json::to_value(AccountView::from(&user)).unwrap();
        assert_eq!(account["email"], "alice@example.com");
        assert!(!account.to_string().contains("$2b$"));
    }
}
