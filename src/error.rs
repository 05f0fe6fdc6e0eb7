//! Authentication Error Types
//!
//! Centralized error handling for all authentication operations.

use crate::store::StoreError;
use crate::token::TokenError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                self.to_string(),
            ),
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
            ),
            AuthError::EmailTaken => (
                StatusCode::CONFLICT,
                "email_taken",
                self.to_string(),
            ),
            AuthError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                msg.clone(),
            ),
            AuthError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "configuration_error",
                msg.clone(),
            ),
            // Store detail never reaches the client
            AuthError::Store(_) | AuthError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::EmailTaken,
            StoreError::Unavailable(msg) => {
                tracing::error!(error = %msg, "credential store error");
                AuthError::Store(msg)
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        tracing::debug!(error = %err, "token rejected");
        AuthError::Unauthenticated
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("token encoding error: {:?}", err);
        AuthError::Internal
    }
}
