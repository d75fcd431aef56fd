//! Call end trigger and call reads.

use crate::{error::ApiError, AppState};
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use std::sync::Arc;
use voxlead_flows::{handle_call_end, CallEndInput, CallEndOutcome, CallUpdateStatus};
use voxlead_store::CallStore;
use voxlead_types::Call;

/// Handler for `POST /api/calls/end`.
///
/// The outcome is always returned as the body; an unknown call answers 404.
pub async fn end_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(input): Json<CallEndInput>,
) -> Result<(StatusCode, Json<CallEndOutcome>), ApiError> {
    crate::error::require("callId", &input.call_id)?;
    let outcome = handle_call_end(&state.flows, input).await;
    let status = match outcome.call_update_status {
        CallUpdateStatus::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// Handler for `GET /api/calls/{callId}`.
pub async fn get_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<Call>, ApiError> {
    state
        .store
        .get_call(&call_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("call not found: {call_id}")))
}
