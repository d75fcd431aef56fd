//! Closing a call: analysis, final call record and lead disposition.

use crate::context::FlowContext;
use crate::transcript::{parse_transcript, transcript_tail};
use serde::{Deserialize, Serialize};
use voxlead_store::CallFinalization;
use voxlead_types::{
    render_transcript, Call, CallAnalysis, CallStatus, LeadStatus, LeadUpsert, Utterance,
};
use voxlead_voice::AnalysisRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndInput {
    pub call_id: String,
    /// Rendered transcript from the caller of this flow. The stored one is
    /// used when absent.
    #[serde(default)]
    pub full_transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallUpdateStatus {
    Completed,
    FailedAnalysis,
    FailedStoreUpdate,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadUpdateStatus {
    Created,
    Updated,
    NotApplicable,
    SkippedNoPhone,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEndOutcome {
    pub call_update_status: CallUpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub lead_update_status: LeadUpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_summary: Option<CallAnalysis>,
}

impl CallEndOutcome {
    fn without_call(status: CallUpdateStatus) -> Self {
        Self {
            call_update_status: status,
            lead_id: None,
            lead_update_status: LeadUpdateStatus::NotApplicable,
            structured_summary: None,
        }
    }
}

pub async fn handle_call_end(ctx: &FlowContext, input: CallEndInput) -> CallEndOutcome {
    let call = match ctx.calls.get_call(&input.call_id).await {
        Ok(Some(call)) => call,
        Ok(None) => {
            tracing::warn!(call_id = %input.call_id, "call end for unknown call");
            return CallEndOutcome::without_call(CallUpdateStatus::NotFound);
        }
        Err(e) => {
            tracing::error!(call_id = %input.call_id, error = %e, "call lookup failed");
            return CallEndOutcome::without_call(CallUpdateStatus::FailedStoreUpdate);
        }
    };
    if call.finalized_at.is_some() {
        tracing::warn!(call_id = %call.id, "call already finalized");
        return CallEndOutcome::without_call(CallUpdateStatus::FailedStoreUpdate);
    }

    let (transcript, tail) = final_transcript(&call, input.full_transcript.as_deref());
    let request = AnalysisRequest {
        call_id: call.id.clone(),
        tenant_id: call.tenant_id.clone(),
        transcript,
    };
    let analysis = match ctx.inference.analyze(&request).await {
        Ok(Some(analysis)) => Some(analysis),
        Ok(None) => {
            tracing::warn!(call_id = %call.id, model = ctx.inference.name(), "analysis returned nothing");
            None
        }
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "analysis failed");
            None
        }
    };

    let Some(analysis) = analysis else {
        let failed = CallAnalysis::failed();
        let finalization = CallFinalization {
            status: CallStatus::Failed,
            transcript_tail: tail,
            summary: failed.summary.clone(),
            intent: Some(failed.intent.clone()),
            lead_score: 0,
            analysis: None,
            duration_seconds: input.duration_seconds,
            recording_url: input.recording_url,
        };
        if let Err(e) = ctx.calls.finalize_call(&call.id, finalization).await {
            tracing::error!(call_id = %call.id, error = %e, "failed to record analysis failure");
        }
        return CallEndOutcome {
            call_update_status: CallUpdateStatus::FailedAnalysis,
            lead_id: None,
            lead_update_status: LeadUpdateStatus::NotApplicable,
            structured_summary: Some(failed),
        };
    };

    let finalization = CallFinalization {
        status: CallStatus::Completed,
        transcript_tail: tail,
        summary: analysis.summary.clone(),
        intent: Some(analysis.intent.clone()),
        lead_score: analysis.lead_score,
        analysis: Some(analysis.clone()),
        duration_seconds: input.duration_seconds,
        recording_url: input.recording_url,
    };
    let call_update_status = match ctx.calls.finalize_call(&call.id, finalization).await {
        Ok(()) => CallUpdateStatus::Completed,
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "failed to finalize call");
            CallUpdateStatus::FailedStoreUpdate
        }
    };

    let (lead_id, lead_update_status) = dispose_lead(ctx, &call, &analysis).await;
    tracing::info!(
        call_id = %call.id,
        intent = %analysis.intent,
        lead_score = analysis.lead_score,
        call_update_status = ?call_update_status,
        lead_update_status = ?lead_update_status,
        "call ended"
    );

    CallEndOutcome {
        call_update_status,
        lead_id,
        lead_update_status,
        structured_summary: Some(analysis),
    }
}

/// The text to analyse and the utterances it adds to the stored transcript.
fn final_transcript(call: &Call, provided: Option<&str>) -> (String, Vec<Utterance>) {
    let Some(provided) = provided.map(str::trim).filter(|t| !t.is_empty()) else {
        return (render_transcript(&call.transcript), Vec::new());
    };
    let tail = transcript_tail(&call.transcript, &parse_transcript(provided)).unwrap_or_else(|| {
        tracing::debug!(call_id = %call.id, "provided transcript diverges from stored one");
        Vec::new()
    });
    (provided.to_string(), tail)
}

async fn dispose_lead(
    ctx: &FlowContext,
    call: &Call,
    analysis: &CallAnalysis,
) -> (Option<String>, LeadUpdateStatus) {
    if !analysis.qualifies_for_lead() {
        return (None, LeadUpdateStatus::NotApplicable);
    }

    let Some(phone_number) = lead_phone_number(ctx, call, analysis).await else {
        tracing::warn!(call_id = %call.id, "no phone number for lead");
        return (None, LeadUpdateStatus::SkippedNoPhone);
    };

    let upsert = LeadUpsert {
        tenant_id: call.tenant_id.clone(),
        phone_number,
        full_name: non_blank(analysis.key_info.contact_name.as_deref()),
        email: non_blank(analysis.key_info.email.as_deref()),
        status: if analysis.appointment.scheduled {
            LeadStatus::AppointmentScheduled
        } else {
            LeadStatus::ToContact
        },
        score: analysis.lead_score,
        interest: non_blank(Some(analysis.summary.as_str())),
        last_call_id: Some(call.id.clone()),
        preferred_appointment_time: analysis.appointment.preferred_time().map(str::to_string),
    };

    match ctx.leads.upsert_lead(upsert).await {
        Ok(write) => {
            if call.lead_id.as_deref() != Some(write.lead_id.as_str()) {
                if let Err(e) = ctx.calls.attach_lead(&call.id, &write.lead_id).await {
                    tracing::warn!(call_id = %call.id, error = %e, "failed to link lead to call");
                }
            }
            let status = if write.created {
                LeadUpdateStatus::Created
            } else {
                LeadUpdateStatus::Updated
            };
            (Some(write.lead_id), status)
        }
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "lead upsert failed");
            (None, LeadUpdateStatus::Failed)
        }
    }
}

/// The number the lead is keyed on. The lead attached at call start wins,
/// then the call's counterpart, then a number the caller dictated.
async fn lead_phone_number(
    ctx: &FlowContext,
    call: &Call,
    analysis: &CallAnalysis,
) -> Option<String> {
    if let Some(lead_id) = call.lead_id.as_deref() {
        match ctx.leads.get_lead(lead_id).await {
            Ok(Some(lead)) if lead.tenant_id == call.tenant_id => {
                if let Some(phone) = non_blank(Some(&lead.phone_number)) {
                    return Some(phone);
                }
            }
            Ok(_) => tracing::warn!(call_id = %call.id, lead_id, "attached lead not found"),
            Err(e) => tracing::warn!(call_id = %call.id, lead_id, error = %e, "attached lead lookup failed"),
        }
    }
    call.counterpart_number()
        .map(str::to_string)
        .or_else(|| non_blank(analysis.key_info.phone_number.as_deref()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
