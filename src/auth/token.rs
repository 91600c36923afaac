use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, instrument};

use super::types::SessionClaims;
use crate::config::AppConfig;
use crate::shared::AppError;

/// Issues and verifies the HS256 credentials clients present when connecting
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>, expiration_days: i64) -> Self {
        Self {
            secret: secret.into(),
            expiration_days,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.jwt_secret.clone(), config.token_expiration_days)
    }

    /// Creates a signed token whose subject is `user_id`
    #[instrument(skip(self, username))]
    pub fn create_token(&self, user_id: &str, username: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = (now + Duration::days(self.expiration_days)).timestamp().max(0) as usize;

        debug!(user_id = %user_id, exp, "Issuing credential");

        let claims = SessionClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp,
            iat: now.timestamp().max(0) as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to sign credential");
            AppError::JwtError(e.to_string())
        })
    }

    /// Verifies signature and expiry, returning the claims if valid
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<SessionClaims, AppError> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(user_id = %data.claims.sub, "Credential verified");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Credential failed verification");
            AppError::JwtError(e.to_string())
        })
    }
}
