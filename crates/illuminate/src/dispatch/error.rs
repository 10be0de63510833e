//! Dispatch error types.

use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur while publishing game state.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Outbound token could not be signed.
    #[error("failed to sign outbound token: {0}")]
    Credential(#[from] AuthError),

    /// Game state could not be encoded.
    #[error("failed to encode game state: {0}")]
    Encode(#[from] serde_json::Error),

    /// Encoded message exceeds the broadcast size cap.
    #[error("message is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Broadcast API answered with a non-2xx status.
    #[error("broadcast API returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The publish task panicked or was cancelled.
    #[error("dispatch task failed: {0}")]
    TaskFailed(String),
}
