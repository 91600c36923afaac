use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::{info, instrument, warn};

use super::{
    generators::generate_username,
    password::{hash_password, verify_password, MIN_PASSWORD_LENGTH},
    types::{AuthResponse, LoginRequest, RegisterRequest, SessionClaims},
};
use crate::shared::{AppError, AppState};
use crate::user::{AccountView, UserModel, UserRepository};

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !email.contains(char::is_whitespace);

    if !valid {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }
    Ok(email)
}

fn issue(state: &AppState, user: &UserModel) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        token: state.token_config.create_token(&user.id, &user.username)?,
        user: AccountView::from(user),
    })
}

/// HTTP handler for registering a user and issuing a connection credential
///
/// POST /api/auth/register
/// Generates a pet-name username when none is supplied
#[instrument(name = "register", skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = normalize_email(&request.email)?;
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let username = request
        .username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(generate_username);

    let password_hash = hash_password(&request.password, state.password_cost).await?;
    let user = UserModel::new(username, email, password_hash);
    state.user_repository.create_user(&user).await?;

    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(issue(&state, &user)?)))
}

/// HTTP handler issuing a fresh credential for an existing account
///
/// POST /api/auth/login
#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let email = normalize_email(&request.email).map_err(|_| invalid())?;
    let Some(user) = state.user_repository.find_by_email(&email).await? else {
        warn!("Login for unknown email");
        return Err(invalid());
    };

    if !verify_password(&request.password, &user.password_hash).await? {
        warn!(user_id = %user.id, "Login with wrong password");
        return Err(invalid());
    }

    info!(user_id = %user.id, username = %user.username, "User logged in");
    Ok(Json(issue(&state, &user)?))
}

/// HTTP handler returning the account behind the bearer credential
///
/// GET /api/auth/me
#[instrument(name = "me", skip(state, claims), fields(user_id = %claims.sub))]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<AccountView>, AppError> {
    let user = state
        .user_repository
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "Credential subject no longer exists");
            AppError::Unauthorized("User not found".to_string())
        })?;

    Ok(Json(AccountView::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{body::Body, http::Request, routing::post, Router};
    use rstest::rstest;
    use tower::ServiceExt; // for `oneshot`

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn auth_app(builder: AppStateBuilder) -> Router {
        Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .with_state(builder.build())
    }

    async fn auth_body(response: axum::response::Response) -> AuthResponse {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_with_username() {
        let builder = AppStateBuilder::new();
        let store = builder.store();
        let token_config = builder.token_config();
        let app = auth_app(builder);

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"username": " alice ", "email": " Alice@Example.com ", "password": "hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let registered = auth_body(response).await;
        assert_eq!(registered.user.username, "alice");
        assert_eq!(registered.user.email, "alice@example.com");

        let claims = token_config.validate_token(&registered.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);

        let stored = store.users.get_user(&registered.user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "hunter22");
        assert!(verify_password("hunter22", &stored.password_hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_generates_username() {
        let app = auth_app(AppStateBuilder::new());

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"email": "someone@example.com", "password": "hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let registered = auth_body(response).await;
        assert!(registered.user.username.contains('-')); // Pet names have dashes
    }

    #[rstest]
    #[case::bad_email(r#"{"email": "not-an-email", "password": "hunter22"}"#)]
    #[case::blank_email(r#"{"email": "  ", "password": "hunter22"}"#)]
    #[case::short_password(r#"{"email": "a@example.com", "password": "abc"}"#)]
    #[tokio::test]
    async fn test_register_rejects_bad_input(#[case] body: &'static str) {
        let response = auth_app(AppStateBuilder::new())
            .oneshot(post_json("/api/auth/register", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_register_duplicate_username_conflicts() {
        let app = auth_app(AppStateBuilder::new());

        let first = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"username": "alice", "email": "alice@example.com", "password": "hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_json(
                "/api/auth/register",
                r#"{"username": "alice", "email": "other@example.com", "password": "hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_issues_fresh_token_for_right_password_only() {
        let builder = AppStateBuilder::new();
        let token_config = builder.token_config();
        let app = auth_app(builder);

        let registered = auth_body(
            app.clone()
                .oneshot(post_json(
                    "/api/auth/register",
                    r#"{"username": "alice", "email": "alice@example.com", "password": "hunter22"}"#,
                ))
                .await
                .unwrap(),
        )
        .await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                r#"{"email": "ALICE@example.com", "password": "hunter22"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let logged_in = auth_body(response).await;
        assert_eq!(logged_in.user.id, registered.user.id);
        let claims = token_config.validate_token(&logged_in.token).unwrap();
        assert_eq!(claims.sub, registered.user.id);

        for body in [
            r#"{"email": "alice@example.com", "password": "hunter23"}"#,
            r#"{"email": "nobody@example.com", "password": "hunter22"}"#,
        ] {
            let response = app
                .clone()
                .oneshot(post_json("/api/auth/login", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
