use serde::{Deserialize, Serialize};

use crate::user::AccountView;

/// JWT claims identifying an authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: String, // Subject: the user's UUID
    pub username: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Request payload for registering a user
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    /// Generated when absent or blank
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub password: String,
}

/// Request payload for logging in with an existing account
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response structure for the registration and login endpoints
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: AccountView,
}
