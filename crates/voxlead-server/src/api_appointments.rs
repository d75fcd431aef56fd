//! Appointment confirmation trigger.

use crate::{
    error::{require, ApiError},
    AppState,
};
use axum::extract::{Extension, Json};
use std::sync::Arc;
use voxlead_flows::{confirm_appointment, AppointmentInput, AppointmentOutcome};

/// Handler for `POST /api/appointments/confirm`.
///
/// Per-channel results are reported in the body, including an overall
/// `failure`; only malformed requests are rejected.
pub async fn confirm_appointment_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(input): Json<AppointmentInput>,
) -> Result<Json<AppointmentOutcome>, ApiError> {
    require("tenantId", &input.tenant_id)?;
    require("leadId", &input.lead_id)?;
    require("appointmentDateTime", &input.appointment_date_time)?;
    require("agentUserId", &input.agent_user_id)?;
    Ok(Json(confirm_appointment(&state.flows, input).await))
}
