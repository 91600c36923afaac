use tracing::{error, warn};

use crate::shared::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hashes off the async runtime; bcrypt is deliberately slow
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            AppError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AppError::Internal
        })
}

/// False for a wrong password and for a stored hash bcrypt can't read
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            AppError::Internal
        })?;

    Ok(verified.unwrap_or_else(|e| {
        warn!(error = %e, "Stored password hash is unusable");
        false
    }))
}
