//! Request and response schemas.
//!
//! Raw bodies deserialize into the `*Request` types, which are validated into
//! the command types before anything touches the registry.

use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::ApiError;
use crate::auth::{AuthError, request_token};
use crate::dispatch::DispatchResult;
use crate::registry::{GameState, GameStatePatch};

pub const NO_REQUEST_BODY: &str = "No valid request body provided.";
pub const MISSING_REQUIRED_DATA: &str = "Missing required data";
pub const NOT_A_BROADCASTER: &str = "Not a broadcaster token";
pub const IDENTITY_MISMATCH: &str = "Token payload and post data mismatch";
pub const INVALID_BROADCASTER: &str = "Invalid broadcaster";
pub const INVALID_TERMINATION_TOKEN: &str = "Invalid termination token";
pub const BROADCASTER_NOT_FOUND: &str = "No broadcaster found with that id";

/// Parse a JSON body. An empty body yields the default request, so the token
/// may come from the authorization header alone.
pub fn parse_body<T>(body: &Bytes, invalid: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ApiError::bad_request(invalid))
}

/// Resolve the token, reporting an absent one as `missing`.
fn token_or(body_token: Option<&str>, headers: &HeaderMap, missing: &str) -> Result<String, ApiError> {
    match request_token(body_token, headers) {
        Ok(token) => Ok(token.to_string()),
        Err(AuthError::MissingToken) => Err(ApiError::bad_request(missing)),
        Err(e) => Err(e.into()),
    }
}

/// `POST /hello` body: the token plus any game state fields.
#[derive(Debug, Default, Deserialize)]
pub struct AnnounceRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub state: Map<String, Value>,
}

#[derive(Debug)]
pub struct AnnounceBroadcaster {
    pub token: String,
    pub patch: GameStatePatch,
}

impl AnnounceRequest {
    pub fn validate(self, headers: &HeaderMap) -> Result<AnnounceBroadcaster, ApiError> {
        let token = token_or(self.token.as_deref(), headers, NO_REQUEST_BODY)?;
        Ok(AnnounceBroadcaster {
            token,
            patch: self.state.into(),
        })
    }
}

/// `POST /register-viewer` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterViewerRequest {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug)]
pub struct RegisterViewer {
    pub token: String,
    pub user_id: String,
    pub channel_id: String,
}

impl RegisterViewerRequest {
    pub fn validate(self, headers: &HeaderMap) -> Result<RegisterViewer, ApiError> {
        let missing = || ApiError::bad_request(MISSING_REQUIRED_DATA);
        let user_id = self.user_id.filter(|v| !v.is_empty()).ok_or_else(missing)?;
        let channel_id = self.channel_id.filter(|v| !v.is_empty()).ok_or_else(missing)?;
        let token = token_or(self.token.as_deref(), headers, MISSING_REQUIRED_DATA)?;

        Ok(RegisterViewer {
            token,
            user_id,
            channel_id,
        })
    }
}

/// `POST /byebye` body.
#[derive(Debug, Default, Deserialize)]
pub struct TeardownRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug)]
pub struct TeardownBroadcaster {
    pub token: String,
}

impl TeardownRequest {
    pub fn validate(self, headers: &HeaderMap) -> Result<TeardownBroadcaster, ApiError> {
        let token = token_or(self.token.as_deref(), headers, NO_REQUEST_BODY)?;
        Ok(TeardownBroadcaster { token })
    }
}

/// Response to an announce.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<GameState>,
}

impl AnnounceResponse {
    /// Nothing changed, so nothing was dispatched.
    pub fn unchanged() -> Self {
        Self {
            success: true,
            error: None,
            game_state: None,
        }
    }

    pub fn dispatched(result: DispatchResult, game_state: GameState) -> Self {
        Self {
            success: result.success,
            error: result.error,
            game_state: Some(game_state),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerResponse {
    pub success: bool,
    pub game_state: GameState,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
}
