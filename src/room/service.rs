use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::RoomModel,
    repository::{AddMemberResult, RoomRepository},
    types::{RoomCreateRequest, RoomResponse},
};
use crate::shared::AppError;
use crate::user::UserRepository;

/// Service for the request/response room operations
pub struct RoomService {
    repository: Arc<dyn RoomRepository>,
    users: Arc<dyn UserRepository>,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repository, users }
    }

    async fn creator_username(&self, user_id: &str) -> Result<Option<String>, AppError> {
        Ok(self.users.get_user(user_id).await?.map(|user| user.username))
    }

    async fn respond(&self, room: RoomModel) -> Result<RoomResponse, AppError> {
        let username = self.creator_username(&room.created_by).await?;
        Ok(RoomResponse::new(room, username))
    }

    /// Creates a room owned by `creator_id`, who becomes its first member
    #[instrument(skip(self))]
    pub async fn create_room(
        &self,
        creator_id: &str,
        request: RoomCreateRequest,
    ) -> Result<RoomResponse, AppError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Room name is required".to_string()));
        }

        let room = RoomModel::new(
            name.to_string(),
            request.description.trim().to_string(),
            request.is_private,
            creator_id.to_string(),
        );
        debug!(room_id = %room.id, "Generated room ID");

        self.repository.create_room(&room).await?;

        info!(room_id = %room.id, name = %room.name, "Room created successfully");
        self.respond(room).await
    }

    #[instrument(skip(self))]
    pub async fn list_rooms(&self) -> Result<Vec<RoomResponse>, AppError> {
        let rooms = self.repository.list_rooms().await?;
        info!(room_count = rooms.len(), "Rooms retrieved successfully");

        let mut usernames: HashMap<String, Option<String>> = HashMap::new();
        let mut responses = Vec::with_capacity(rooms.len());
        for room in rooms {
            let username = match usernames.get(&room.created_by) {
                Some(username) => username.clone(),
                None => {
                    let username = self.creator_username(&room.created_by).await?;
                    usernames.insert(room.created_by.clone(), username.clone());
                    username
                }
            };
            responses.push(RoomResponse::new(room, username));
        }
        Ok(responses)
    }

    /// Adds the user to the room's member set; joining twice is a no-op
    #[instrument(skip(self))]
    pub async fn join_room(&self, room_id: &str, user_id: &str) -> Result<RoomResponse, AppError> {
        match self.repository.add_member(room_id, user_id).await? {
            AddMemberResult::Added(room) | AddMemberResult::AlreadyMember(room) => {
                info!(
                    room_id = %room_id,
                    user_id = %user_id,
                    member_count = room.member_count(),
                    "User is a member of room"
                );
                self.respond(room).await
            }
            AddMemberResult::RoomNotFound => Err(AppError::NotFound("Room not found".to_string())),
        }
    }
}
