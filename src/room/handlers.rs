use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::RoomService,
    types::{RoomCreateRequest, RoomResponse},
};
use crate::auth::SessionClaims;
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new room
///
/// POST /api/rooms
/// The caller becomes the creator and first member
#[instrument(name = "create_room", skip(state, claims))]
pub async fn create_room(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<RoomCreateRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), AppError> {
    info!(user_id = %claims.sub, name = %request.name, "Creating new room");

    let service = RoomService::new(
        Arc::clone(&state.room_repository),
        Arc::clone(&state.user_repository),
    );
    let room = service.create_room(&claims.sub, request).await?;

    Ok((StatusCode::CREATED, Json(room)))
}

/// HTTP handler for listing all rooms
///
/// GET /api/rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let service = RoomService::new(
        Arc::clone(&state.room_repository),
        Arc::clone(&state.user_repository),
    );
    let rooms = service.list_rooms().await?;

    Ok(Json(rooms))
}

/// HTTP handler for joining a room's persisted member set
///
/// POST /api/rooms/:room_id/join
#[instrument(name = "join_room", skip(state, claims))]
pub async fn join_room(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let service = RoomService::new(
        Arc::clone(&state.room_repository),
        Arc::clone(&state.user_repository),
    );
    let room = service.join_room(&room_id, &claims.sub).await?;

    Ok(Json(room))
}
