use thiserror::Error;

use crate::shared::AppError;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] AppError),
}
