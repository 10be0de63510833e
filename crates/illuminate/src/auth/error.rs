//! Authentication errors.

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token in the body or the authorization header.
    #[error("missing token")]
    MissingToken,

    /// Invalid authorization header format.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// Invalid token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token expired.
    #[error("token expired")]
    TokenExpired,

    /// Shared secret is not valid base64 or is empty.
    #[error("invalid extension secret: {0}")]
    InvalidSecret(String),

    /// Internal error.
    #[error("internal auth error: {0}")]
    Internal(String),
}
