use serde::{Deserialize, Serialize};

use super::models::RoomModel;

/// Request payload for creating a new room
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
}

/// The room creator as shown to clients; `username` is null once the account is gone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomCreator {
    pub id: String,
    pub username: Option<String>,
}

/// Response for room creation and room information
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub created_by: RoomCreator,
    pub members: Vec<String>,
    pub member_count: usize,
}

impl RoomResponse {
    pub fn new(room: RoomModel, creator_username: Option<String>) -> Self {
        Self {
            member_count: room.member_count(),
            id: room.id,
            name: room.name,
            description: room.description,
            is_private: room.is_private,
            created_by: RoomCreator {
                id: room.created_by,
                username: creator_username,
            },
            members: room.members,
        }
    }
}
