use thiserror::Error;

use crate::event::ApiResponse;

/// Everything a handler can fail with, mapped onto HTTP status codes.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("configuration error: {0}")]
    Config(String),

    /// Upstream provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// The provider call exceeded its deadline.
    #[error("provider request timed out")]
    ProviderTimeout,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn status_code(&self) -> u16 {
        match self {
            HandlerError::Validation(_) => 400,
            HandlerError::MethodNotAllowed => 405,
            HandlerError::Config(_) => 500,
            HandlerError::Provider { .. } => 502,
            HandlerError::ProviderTimeout => 504,
            HandlerError::Database(_) => 500,
            HandlerError::Other(_) => 500,
        }
    }

    pub fn into_response(self) -> ApiResponse {
        ApiResponse::error(self.status_code(), &self.to_string())
    }
}
