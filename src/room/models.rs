use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for rooms table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomModel {
    pub id: String,
    pub name: String, // Unique across rooms
    pub description: String,
    pub is_private: bool,
    pub created_by: String,   // UUID of the creating user
    pub members: Vec<String>, // Member user UUIDs, never duplicated
    pub created_at: DateTime<Utc>,
}

impl RoomModel {
    /// Creates a new room with generated ID; the creator is the first member
    pub fn new(name: String, description: String, is_private: bool, created_by: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description,
            is_private,
            members: vec![created_by.clone()],
            created_by,
            created_at: Utc::now(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    /// Adds a member with set semantics, returns whether the set changed
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.has_member(user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        true
    }
}
