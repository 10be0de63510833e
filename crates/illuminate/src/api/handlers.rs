//! Request handlers for the relay endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use tracing::{debug, info, instrument};

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use super::types::*;
use crate::dispatch::DispatchResult;
use crate::registry::GameState;

/// Register or update a broadcaster and push changed state to viewers.
#[instrument(skip_all)]
pub async fn announce_broadcaster(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AnnounceResponse>> {
    let request: AnnounceRequest = parse_body(&body, NO_REQUEST_BODY)?;
    let announce = request.validate(&headers)?;

    let claims = state.auth.verify(&announce.token)?;
    if !claims.is_broadcaster() {
        return Err(ApiError::forbidden(NOT_A_BROADCASTER));
    }
    let channel_id = claims
        .channel_id()
        .ok_or_else(|| ApiError::unauthorized("Token has no channel"))?;

    let update = state.registry.upsert_and_merge(channel_id, &announce.patch);
    if !update.changed {
        debug!(channel_id, "broadcaster hello without state changes");
        return Ok(Json(AnnounceResponse::unchanged()));
    }

    let result = state
        .dispatcher
        .dispatch(channel_id, &update.game_state)
        .await;
    Ok(Json(AnnounceResponse::dispatched(result, update.game_state)))
}

/// Attach a viewer to a broadcaster and hand back the current game state.
#[instrument(skip_all)]
pub async fn register_viewer(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ViewerResponse>> {
    let request: RegisterViewerRequest = parse_body(&body, MISSING_REQUIRED_DATA)?;
    let viewer = request.validate(&headers)?;

    let claims = state.auth.verify(&viewer.token)?;
    if !claims.identifies(&viewer.user_id) || claims.channel_id() != Some(viewer.channel_id.as_str())
    {
        return Err(ApiError::forbidden(IDENTITY_MISMATCH));
    }

    let game_state = state
        .registry
        .register_viewer(&viewer.channel_id, &viewer.user_id)
        .map_err(|_| ApiError::not_found(INVALID_BROADCASTER))?;

    Ok(Json(ViewerResponse {
        success: true,
        game_state,
    }))
}

/// Hide the overlay for every viewer and drop the broadcaster's session.
#[instrument(skip_all)]
pub async fn teardown_broadcaster(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DispatchResult>> {
    let request: TeardownRequest = parse_body(&body, NO_REQUEST_BODY)?;
    let teardown = request.validate(&headers)?;

    let claims = state.auth.verify(&teardown.token)?;
    let channel_id = match claims.channel_id() {
        Some(channel_id) if claims.is_broadcaster() => channel_id,
        _ => return Err(ApiError::forbidden(INVALID_TERMINATION_TOKEN)),
    };

    // Remove before dispatching the reset. If the order were reversed, a /hello
    // arriving while the reset is in flight would upsert into the old session
    // and the removal that follows would silently drop its fresh state.
    if !state.registry.remove(channel_id) {
        return Err(ApiError::not_found(BROADCASTER_NOT_FOUND));
    }

    let result = state
        .dispatcher
        .dispatch(channel_id, &GameState::reset())
        .await;
    if result.success {
        info!(channel_id, "stopped broadcasting talents");
    }
    Ok(Json(result))
}

/// Liveness check.
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse { success: true })
}
