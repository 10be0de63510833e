//! Wire types for the broadcast API and dispatch outcomes.

use serde::{Deserialize, Serialize};

use super::DispatchError;

/// Body of an extension message post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub content_type: String,
    /// JSON-encoded game state.
    pub message: String,
    pub targets: Vec<String>,
}

impl MessageEnvelope {
    /// JSON message for every viewer of the channel.
    pub fn broadcast(message: String) -> Self {
        Self {
            content_type: "application/json".to_string(),
            message,
            targets: vec!["broadcast".to_string()],
        }
    }
}

/// Outcome of a dispatch, relayed to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<(), DispatchError>> for DispatchResult {
    fn from(result: Result<(), DispatchError>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failed(e),
        }
    }
}
