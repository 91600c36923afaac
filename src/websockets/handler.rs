use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{AuthenticatedConnection, CredentialSource};
use crate::shared::AppState;
use crate::user::UserModel;

use super::{
    connection_manager::ConnectionManager,
    connection_state::ConnectionState,
    event_handlers::{shared::Outbound, RelayError, RelayServices},
    messages::{ClientEvent, ServerEvent},
    socket::{Connection, MessageHandler, SocketWrapper},
};

/// Routes each inbound frame of a connection to the relay component that owns it
pub struct EventRouter {
    relay: RelayServices,
    connection_manager: Arc<dyn ConnectionManager>,
}

impl EventRouter {
    pub fn new(relay: RelayServices, connection_manager: Arc<dyn ConnectionManager>) -> Self {
        Self {
            relay,
            connection_manager,
        }
    }

    async fn dispatch(&self, state: &mut ConnectionState, event: ClientEvent) -> Result<(), RelayError> {
        match event {
            ClientEvent::JoinRoom(payload) => self.relay.membership.join(state, &payload.room_id).await,
            ClientEvent::LeaveRoom(payload) => {
                self.relay.typing.clear_room(state, &payload.room_id).await?;
                self.relay.membership.leave(state, &payload.room_id).await
            }
            ClientEvent::SendMessage(payload) => {
                self.relay
                    .broadcaster
                    .send(state, &payload.room_id, &payload.content)
                    .await
            }
            ClientEvent::Typing(payload) => self.relay.typing.typing(state, &payload.room_id).await,
            ClientEvent::StopTyping(payload) => {
                self.relay.typing.stop_typing(state, &payload.room_id).await
            }
        }
    }

    async fn reply_error(&self, state: &ConnectionState, message: String) {
        if let Err(e) = Outbound::to_connection(
            &self.connection_manager,
            &state.connection_id,
            &ServerEvent::error(message),
        )
        .await
        {
            error!(connection_id = %state.connection_id, error = %e, "Failed to send error event");
        }
    }
}

#[async_trait]
impl MessageHandler for EventRouter {
    async fn handle_message(&self, state: &mut ConnectionState, message: String) {
        if !state.is_active() {
            debug!(connection_id = %state.connection_id, "Frame on inactive connection ignored");
            return;
        }

        let event = match ClientEvent::parse(&message) {
            Ok(event) => event,
            Err(reason) => {
                warn!(
                    connection_id = %state.connection_id,
                    user_id = %state.user_id,
                    error = %reason,
                    "Failed to parse WebSocket message"
                );
                self.reply_error(state, reason).await;
                return;
            }
        };

        let event_type = event.event_type();
        debug!(
            connection_id = %state.connection_id,
            user_id = %state.user_id,
            event_type,
            room_id = %event.room_id(),
            "Received event"
        );

        if let Err(e) = self.dispatch(state, event).await {
            error!(
                connection_id = %state.connection_id,
                user_id = %state.user_id,
                event_type,
                error = %e,
                "Failed to handle event"
            );
            self.reply_error(state, format!("Failed to process {}", event_type))
                .await;
        }
    }
}

/// WebSocket endpoint. The credential is verified by the `AuthenticatedConnection`
/// extractor, so a refused attempt is answered with 401 and never upgraded.
pub async fn websocket_handler(
    auth: AuthenticatedConnection,
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> Response {
    let ws = match &auth.source {
        CredentialSource::Protocol(token) => ws.protocols([token.clone()]),
        _ => ws,
    };

    info!(user_id = %auth.user.id, "WebSocket upgrade accepted");
    ws.on_upgrade(move |socket| serve_connection(Box::new(socket), auth.user, app_state))
}

/// Drives one authenticated connection from registration to cleanup
pub async fn serve_connection(mut socket: Box<dyn SocketWrapper>, user: UserModel, app_state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let mut state = ConnectionState::new(connection_id.clone(), user.id.clone(), user.username.clone());

    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .connection_manager
        .add_connection(connection_id.clone(), user.id.clone(), outbound_sender)
        .await;

    // Subscriptions first, so a shared-rooms presence announcement can see them
    if let Err(e) = app_state.relay.membership.sync_on_connect(&mut state).await {
        error!(
            connection_id = %connection_id,
            user_id = %user.id,
            error = %e,
            "Failed to restore room subscriptions"
        );
    }

    if let Err(e) = app_state.relay.presence.connect(&state).await {
        error!(
            connection_id = %connection_id,
            user_id = %user.id,
            error = %e,
            "Failed to mark user online, closing connection"
        );
        app_state
            .connection_manager
            .remove_connection(&connection_id)
            .await;
        let _ = socket.close().await;
        return;
    }

    info!(
        connection_id = %connection_id,
        user_id = %user.id,
        username = %user.username,
        rooms = state.subscriptions.len(),
        "WebSocket connection established"
    );

    let connection = Connection::new(state, socket, outbound_receiver, app_state.router.clone());

    let (mut state, result) = connection.run().await;
    match result {
        Ok(()) => info!(connection_id = %connection_id, "WebSocket connection closed cleanly"),
        Err(e) => warn!(connection_id = %connection_id, error = ?e, "WebSocket connection error"),
    }

    if let Err(e) = state.close() {
        warn!(connection_id = %connection_id, error = %e, "Connection already closed");
    }

    if let Err(e) = app_state.relay.typing.clear_all(&mut state).await {
        warn!(connection_id = %connection_id, error = %e, "Failed to clear typing indicators");
    }

    app_state
        .connection_manager
        .remove_connection(&connection_id)
        .await;

    if let Err(e) = app_state.relay.presence.disconnect(&state).await {
        error!(
            connection_id = %connection_id,
            user_id = %user.id,
            error = %e,
            "Failed to record disconnect"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::{test_user, AppStateBuilder};
    use crate::user::UserRepository;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn router_with_connection() -> (EventRouter, ConnectionState, UnboundedReceiver<String>) {
        let app_state = AppStateBuilder::new().build();
        let user = test_user("alice");
        app_state.user_repository.create_user(&user).await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        app_state
            .connection_manager
            .add_connection("c1".into(), user.id.clone(), tx)
            .await;

        let router = EventRouter::new(app_state.relay.clone(), app_state.connection_manager.clone());
        (router, ConnectionState::new("c1".into(), user.id, user.username), rx)
    }

    fn events(rx: &mut UnboundedReceiver<String>) -> Vec<ServerEvent> {
        let mut out = vec![];
        while let Ok(msg) = rx.try_recv() {
            out.push(serde_json::from_str(&msg).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_malformed_frames_get_private_error() {
        let (router, mut state, mut rx) = router_with_connection().await;

        router.handle_message(&mut state, "{not json".into()).await;
        router
            .handle_message(&mut state, r#"{"type":"fly","payload":{}}"#.into())
            .await;

        let received = events(&mut rx);
        assert_eq!(received.len(), 2);
        assert!(received.iter().all(|e| matches!(e, ServerEvent::Error(_))));
    }

    #[tokio::test]
    async fn test_frames_after_close_are_ignored() {
        let (router, mut state, mut rx) = router_with_connection().await;
        state.close().unwrap();

        router
            .handle_message(&mut state, r#"{"type":"joinRoom","payload":{"roomId":"r1"}}"#.into())
            .await;

        assert!(events(&mut rx).is_empty());
        assert!(state.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn test_leave_clears_outstanding_typing() {
        let (router, mut state, _rx) = router_with_connection().await;
        state.subscriptions.insert("r1".into());
        state.typing.insert("r1".into());

        router
            .handle_message(&mut state, r#"{"type":"leaveRoom","payload":{"roomId":"r1"}}"#.into())
            .await;

        assert!(state.typing.is_empty());
        assert!(state.subscriptions.is_empty());
    }
}
