use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{token::TokenConfig, types::SessionClaims};
use crate::shared::{AppError, AppState};
use crate::user::{UserModel, UserRepository};
use crate::websockets::{ConnectionPhase, PhaseEvent};

const PROTOCOL_HEADER: &str = "sec-websocket-protocol";

/// Verifies connection credentials against the shared secret.
///
/// Stateless: every attempt is judged on its own and nothing is written.
#[derive(Clone)]
pub struct ConnectionAuthenticator {
    token_config: Arc<TokenConfig>,
}

impl ConnectionAuthenticator {
    pub fn new(token_config: Arc<TokenConfig>) -> Self {
        Self { token_config }
    }

    /// Returns the verified claims, or `Unauthorized` for a missing, malformed,
    /// expired or wrongly signed credential
    pub fn authenticate(&self, credential: Option<&str>) -> Result<SessionClaims, AppError> {
        let token = credential
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Authentication error".to_string()))?;

        self.token_config.validate_token(token).map_err(|e| {
            debug!(error = %e, "Credential rejected");
            AppError::Unauthorized("Authentication error".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct CredentialQuery {
    token: Option<String>,
}

/// Where the credential was found in the handshake
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialSource {
    Query(String),
    Bearer(String),
    /// Must be echoed back as the selected subprotocol
    Protocol(String),
}

impl CredentialSource {
    pub fn token(&self) -> &str {
        match self {
            CredentialSource::Query(token)
            | CredentialSource::Bearer(token)
            | CredentialSource::Protocol(token) => token,
        }
    }

    /// Looks for the credential in the `token` query parameter, a Bearer
    /// Authorization header, then the Sec-WebSocket-Protocol header
    pub fn from_parts(parts: &Parts) -> Option<Self> {
        if let Some(token) = Query::<CredentialQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
        {
            return Some(CredentialSource::Query(token));
        }

        if let Some(token) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            return Some(CredentialSource::Bearer(token.to_string()));
        }

        parts
            .headers
            .get(PROTOCOL_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| CredentialSource::Protocol(token.to_string()))
    }
}

/// Identity established by the handshake, extracted before the WebSocket upgrade
/// so a refused attempt never reaches presence or room state
#[derive(Debug, Clone)]
pub struct AuthenticatedConnection {
    pub claims: SessionClaims,
    pub user: UserModel,
    pub source: CredentialSource,
    /// `Active` once the credential and its subject are verified
    pub phase: ConnectionPhase,
}

impl AuthenticatedConnection {
    async fn verify(
        parts: &Parts,
        state: &AppState,
    ) -> Result<(SessionClaims, UserModel, CredentialSource), AppError> {
        let Some(source) = CredentialSource::from_parts(parts) else {
            warn!("Connection attempt without credential");
            return Err(AppError::Unauthorized("Authentication error".to_string()));
        };

        let claims = state.authenticator.authenticate(Some(source.token()))?;

        let user = state
            .user_repository
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Credential subject no longer exists");
                AppError::Unauthorized("Authentication error".to_string())
            })?;

        Ok((claims, user, source))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedConnection {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let phase = ConnectionPhase::Unauthenticated.transition(PhaseEvent::Attempt)?;

        match Self::verify(parts, state).await {
            Ok((claims, user, source)) => {
                let phase = phase.transition(PhaseEvent::Verified)?;
                info!(user_id = %user.id, username = %user.username, "Connection authenticated");

                Ok(Self {
                    claims,
                    user,
                    source,
                    phase,
                })
            }
            Err(e) => {
                let phase = phase.transition(PhaseEvent::Rejected)?;
                debug!(?phase, "Handshake refused");
                Err(e)
            }
        }
    }
}
