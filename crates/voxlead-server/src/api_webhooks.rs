//! Telephony webhooks. Voice and speech always answer with TwiML.

use crate::AppState;
use axum::{
    extract::{Extension, Form, Query},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use voxlead_flows::{
    handle_call_end, handle_call_start, handle_speech_segment, CallEndInput, CallStartInput,
    SpeechSegmentInput,
};
use voxlead_store::CallStore;

/// An XML body with the content type Twilio expects.
pub struct Twiml(pub String);

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.0).into_response()
    }
}

/// Call-start parameters posted by the platform.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VoiceForm {
    pub call_sid: String,
    pub account_sid: String,
    pub from: String,
    pub to: String,
    pub call_status: String,
    pub direction: String,
}

/// Query tags added to the TwiML URL of calls we place ourselves.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceQuery {
    pub tenant_id: Option<String>,
    pub lead_id: Option<String>,
    pub agent_id: Option<String>,
}

/// Handler for `POST /webhooks/voice`.
pub async fn voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<VoiceQuery>,
    Form(form): Form<VoiceForm>,
) -> Twiml {
    if let Some(tenant_id) = &query.tenant_id {
        tracing::debug!(call_sid = %form.call_sid, tenant_id = %tenant_id, "outbound call connected");
    }
    let input = CallStartInput {
        call_sid: form.call_sid,
        account_sid: form.account_sid,
        from: form.from,
        to: form.to,
        call_status: form.call_status,
        direction: form.direction,
        lead_hint: query.lead_id,
        agent_hint: query.agent_id,
    };
    Twiml(handle_call_start(&state.flows, input).await)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechQuery {
    pub call_id: String,
    pub tenant_id: String,
    pub agent_id: Option<String>,
}

/// Gather result. Confidence arrives as text and may be empty.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpeechForm {
    pub speech_result: Option<String>,
    pub confidence: Option<String>,
    pub recording_url: Option<String>,
}

/// Handler for `POST /webhooks/speech?callId&tenantId&agentId`.
pub async fn speech_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<SpeechQuery>,
    Form(form): Form<SpeechForm>,
) -> Twiml {
    let input = SpeechSegmentInput {
        call_id: query.call_id,
        tenant_id: query.tenant_id,
        agent_id: query.agent_id.filter(|a| !a.trim().is_empty()),
        speech_text: form.speech_result,
        confidence: form.confidence.and_then(|c| c.trim().parse().ok()),
        audio_url: form.recording_url.filter(|u| !u.trim().is_empty()),
    };
    let outcome = handle_speech_segment(&state.flows, input).await;
    Twiml(outcome.twiml)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CallStatusForm {
    pub call_sid: String,
    pub call_status: String,
    pub call_duration: Option<String>,
    pub recording_url: Option<String>,
}

/// Platform statuses after which the call is over.
pub fn is_terminal_status(status: &str) -> bool {
    matches!(
        status.trim().to_ascii_lowercase().as_str(),
        "completed" | "failed" | "busy" | "no-answer" | "canceled"
    )
}

/// Handler for `POST /webhooks/call-status`.
///
/// Runs the call end flow once the platform reports a terminal status for a
/// call that is still open. Always answers 200 so the platform does not retry.
pub async fn call_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<CallStatusForm>,
) -> Json<serde_json::Value> {
    if !is_terminal_status(&form.call_status) {
        tracing::debug!(call_sid = %form.call_sid, status = %form.call_status, "call status update");
        return Json(json!({ "handled": false }));
    }

    let call = match state.store.find_call_by_external_sid(form.call_sid.trim()).await {
        Ok(Some(call)) => call,
        Ok(None) => {
            tracing::warn!(call_sid = %form.call_sid, "status callback for unknown call");
            return Json(json!({ "handled": false }));
        }
        Err(e) => {
            tracing::error!(call_sid = %form.call_sid, error = %e, "call lookup failed");
            return Json(json!({ "handled": false }));
        }
    };
    if call.finalized_at.is_some() {
        return Json(json!({ "handled": false, "callId": call.id }));
    }

    let input = CallEndInput {
        call_id: call.id.clone(),
        full_transcript: None,
        recording_url: form.recording_url.filter(|u| !u.trim().is_empty()),
        duration_seconds: form
            .call_duration
            .and_then(|d| d.trim().parse().ok())
            .unwrap_or_default(),
    };
    let outcome = handle_call_end(&state.flows, input).await;
    Json(json!({
        "handled": true,
        "callId": call.id,
        "outcome": outcome,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal_status("completed"));
        assert!(is_terminal_status("No-Answer"));
        assert!(!is_terminal_status("in-progress"));
        assert!(!is_terminal_status("ringing"));
    }
}
