use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::{info, instrument};

use super::{models::MessageView, repository::MessageRepository};
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// HTTP handler for reading a room's message history
///
/// GET /api/messages/:room_id?limit=N
/// Returns the latest N messages oldest first, each with its sender profile
#[instrument(name = "get_room_messages", skip(state))]
pub async fn get_room_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageView>>, AppError> {
    let limit = query
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(state.history_limit);

    let messages = state
        .message_repository
        .recent_messages(&room_id, limit)
        .await?;

    info!(
        room_id = %room_id,
        message_count = messages.len(),
        "Room history retrieved"
    );
    Ok(Json(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageModel;
    use crate::room::{models::RoomModel, RoomRepository};
    use crate::shared::test_utils::{test_user, AppStateBuilder};
    use crate::user::UserRepository;
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt; // for `oneshot`

    #[tokio::test]
    async fn test_history_honours_limit_and_default() {
        let builder = AppStateBuilder::new().with_history_limit(2);
        let store = builder.store();
        let alice = test_user("alice");
        store.users.create_user(&alice).await.unwrap();
        let room = RoomModel::new("general".into(), String::new(), false, alice.id.clone());
        store.rooms.create_room(&room).await.unwrap();
        for i in 0..4 {
            let message = MessageModel::text(alice.id.clone(), room.id.clone(), format!("m{i}"));
            store.messages.create_message(&message).await.unwrap();
        }

        let app = Router::new()
            .route("/api/messages/:room_id", get(get_room_messages))
            .with_state(builder.build());

        let fetch = |uri: String| {
            let app = app.clone();
            async move {
                let response = app
                    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                    .await
                    .unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap();
                serde_json::from_slice::<Vec<MessageView>>(&body).unwrap()
            }
        };

        let default_page = fetch(format!("/api/messages/{}", room.id)).await;
        let contents: Vec<&str> = default_page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);

        let all = fetch(format!("/api/messages/{}?limit=10", room.id)).await;
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].sender.username, "alice");
    }
}
