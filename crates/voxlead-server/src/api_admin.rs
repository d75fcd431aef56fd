//! Directory administration: agent configurations and number routing.

use crate::{
    error::{require, ApiError},
    AppState,
};
use axum::extract::{Extension, Json, Path};
use serde::Deserialize;
use std::sync::Arc;
use voxlead_store::Directory;
use voxlead_types::{AgentConfig, NumberMapping};

/// Request body for `PUT /api/agents/{agentId}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub tenant_id: String,
    pub system_prompt: String,
    pub voice_provider: String,
    pub voice_id: String,
    pub initial_greeting: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Handler for `PUT /api/agents/{agentId}`.
///
/// Creates or replaces the agent. Calls already in progress keep the
/// configuration they started with.
pub async fn put_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
    Json(payload): Json<AgentRequest>,
) -> Result<Json<AgentConfig>, ApiError> {
    require("tenantId", &payload.tenant_id)?;
    require("initialGreeting", &payload.initial_greeting)?;

    if let Some(existing) = state.store.agent_config(&agent_id).await? {
        if existing.tenant_id != payload.tenant_id {
            return Err(ApiError::Conflict(format!(
                "agent {agent_id} belongs to another tenant"
            )));
        }
    }

    let config = AgentConfig {
        agent_id,
        tenant_id: payload.tenant_id,
        system_prompt: payload.system_prompt,
        voice_provider: payload.voice_provider,
        voice_id: payload.voice_id,
        initial_greeting: payload.initial_greeting,
        language: payload
            .language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| state.flows.telephony.default_language.clone()),
    };
    state.store.put_agent(config.clone()).await?;
    tracing::info!(agent_id = %config.agent_id, tenant_id = %config.tenant_id, "agent configured");
    Ok(Json(config))
}

/// Request body for `PUT /api/numbers/{number}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberRequest {
    pub tenant_id: String,
    pub agent_id: String,
}

/// Handler for `PUT /api/numbers/{number}`.
///
/// The agent must already exist and belong to the same tenant.
pub async fn put_number_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(number): Path<String>,
    Json(payload): Json<NumberRequest>,
) -> Result<Json<NumberMapping>, ApiError> {
    require("number", &number)?;
    require("tenantId", &payload.tenant_id)?;
    require("agentId", &payload.agent_id)?;

    match state.store.agent_config(&payload.agent_id).await? {
        Some(agent) if agent.tenant_id == payload.tenant_id => {}
        Some(_) => {
            return Err(ApiError::Conflict(format!(
                "agent {} belongs to another tenant",
                payload.agent_id
            )))
        }
        None => {
            return Err(ApiError::NotFound(format!(
                "agent not found: {}",
                payload.agent_id
            )))
        }
    }

    let mapping = NumberMapping {
        phone_number: number.trim().to_string(),
        tenant_id: payload.tenant_id,
        agent_id: payload.agent_id,
    };
    state.store.put_number(mapping.clone()).await?;
    tracing::info!(number = %mapping.phone_number, tenant_id = %mapping.tenant_id, "number mapped");
    Ok(Json(mapping))
}
