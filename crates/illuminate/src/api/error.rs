//! API error handling with `{success: false, error}` bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::AuthError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced to API callers.
///
/// The message is returned verbatim in the `error` field, which extension
/// frontends match on.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Required request data is missing or malformed.
    #[error("{0}")]
    BadRequest(String),

    /// Token missing, malformed, expired or badly signed.
    #[error("{0}")]
    Unauthorized(String),

    /// Valid token that does not grant this operation.
    #[error("{0}")]
    Forbidden(String),

    /// No session for the referenced channel.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        let message = self.to_string();

        match &self {
            ApiError::Internal(msg) => error!(error_code = code, message = %msg, "API error"),
            _ => debug!(error_code = code, message = %message, "Client error"),
        }

        let body = ErrorResponse {
            success: false,
            error: message,
            code,
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::BadRequest("Missing token".to_string()),
            AuthError::InvalidAuthHeader => {
                ApiError::Unauthorized("Invalid authorization header".to_string())
            }
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(format!("Invalid token: {msg}")),
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidSecret(msg) | AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}
