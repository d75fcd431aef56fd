//! Lead follow-up trigger and lead listing.

use crate::{
    error::{require, ApiError},
    AppState,
};
use axum::extract::{Extension, Json, Path};
use serde::Deserialize;
use std::sync::Arc;
use voxlead_flows::{follow_up_lead, FollowUpInput, FollowUpOutcome};
use voxlead_store::LeadStore;
use voxlead_types::{FollowUpStrategy, Lead};

/// Request body for `POST /api/leads/{leadId}/follow-up`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    pub tenant_id: String,
    pub follow_up_strategy: FollowUpStrategy,
    #[serde(default)]
    pub message_template_id: Option<String>,
    #[serde(default)]
    pub custom_message: Option<String>,
    #[serde(default)]
    pub ai_agent_id: Option<String>,
    #[serde(default)]
    pub crm_payload: Option<serde_json::Value>,
}

/// Handler for `POST /api/leads/{leadId}/follow-up`.
pub async fn follow_up_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(lead_id): Path<String>,
    Json(payload): Json<FollowUpRequest>,
) -> Result<Json<FollowUpOutcome>, ApiError> {
    require("tenantId", &payload.tenant_id)?;
    let input = FollowUpInput {
        tenant_id: payload.tenant_id,
        lead_id,
        strategy: payload.follow_up_strategy,
        message_template_id: payload.message_template_id,
        custom_message: payload.custom_message,
        ai_agent_id: payload.ai_agent_id,
        crm_payload: payload.crm_payload,
    };
    Ok(Json(follow_up_lead(&state.flows, input).await))
}

/// Handler for `GET /api/tenants/{tenantId}/leads`.
pub async fn list_leads_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Vec<Lead>>, ApiError> {
    Ok(Json(state.store.list_leads(&tenant_id).await?))
}
