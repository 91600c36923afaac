use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::user::UserProfile;

/// Kind of a persisted message, stored as text
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Text,
    System,
}

/// Database model for messages table. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageModel {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub room_id: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl MessageModel {
    /// Creates a user-authored text message
    pub fn text(sender_id: String, room_id: String, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            sender_id,
            room_id,
            kind: MessageKind::Text,
            created_at: Utc::now(),
        }
    }
}

/// A persisted message joined with its sender's public profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub content: String,
    pub sender: UserProfile,
    pub room: String,
    pub message_type: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: MessageModel, sender: UserProfile) -> Self {
        Self {
            id: message.id,
            content: message.content,
            sender,
            room: message.room_id,
            message_type: message.kind,
            created_at: message.created_at,
        }
    }
}
