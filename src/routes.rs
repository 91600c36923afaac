use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug_span, warn, Span};

use crate::auth::{jwt_auth, login, me, register};
use crate::config::AppConfig;
use crate::message::get_room_messages;
use crate::room::{create_room, join_room, list_rooms};
use crate::shared::AppState;
use crate::websockets::websocket_handler;

/// Builds the full HTTP surface: health, registration, the authenticated REST API and `/ws`
pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/rooms", get(list_rooms).post(create_room))
        .route("/api/rooms/:room_id/join", post(join_room))
        .route("/api/messages/:room_id", get(get_room_messages))
        .layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_handler))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .merge(api)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

// Path only: `/ws` may carry the credential in its query string
fn request_span(req: &Request) -> Span {
    debug_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        version = ?req.version(),
    )
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "Server is running"
    }))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
