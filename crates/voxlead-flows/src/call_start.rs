//! First webhook of a call: route it, record it and greet the caller.

use crate::context::FlowContext;
use serde::{Deserialize, Serialize};
use voxlead_types::{AgentConfig, Call, CallDirection, CallStatus, NewCall, NumberMapping};
use voxlead_voice::{encode_greeting_and_gather, GatherParams, VoiceParams};

/// The telephony platform's call-start parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStartInput {
    pub call_sid: String,
    pub account_sid: String,
    pub from: String,
    pub to: String,
    pub call_status: String,
    pub direction: String,
    /// Set on calls we placed ourselves.
    pub lead_hint: Option<String>,
    pub agent_hint: Option<String>,
}

/// Handles a new call and returns the TwiML to answer it with.
///
/// Never fails: lookup misses and store errors become a spoken apology
/// followed by a hang-up.
pub async fn handle_call_start(ctx: &FlowContext, input: CallStartInput) -> String {
    let direction = CallDirection::from_telephony(&input.direction);
    // Our number is the one that was called on inbound calls and the caller ID
    // on outbound ones.
    let (our_number, their_number) = match direction {
        CallDirection::Inbound => (input.to.as_str(), input.from.as_str()),
        CallDirection::Outbound => (input.from.as_str(), input.to.as_str()),
    };
    tracing::info!(
        call_sid = %input.call_sid,
        direction = %direction,
        status = %input.call_status,
        "call started"
    );

    let mapping = match ctx.directory.lookup_number(our_number).await {
        Ok(Some(mapping)) => mapping,
        Ok(None) => {
            tracing::warn!(call_sid = %input.call_sid, number = our_number, "number not mapped to any tenant");
            return ctx.hangup(&ctx.telephony.unmapped_number_message);
        }
        Err(e) => {
            tracing::error!(call_sid = %input.call_sid, error = %e, "directory lookup failed");
            return ctx.hangup(&ctx.telephony.service_unavailable_message);
        }
    };

    let Some(agent) = resolve_agent(ctx, &mapping, input.agent_hint.as_deref()).await else {
        return ctx.hangup(&ctx.telephony.agent_unavailable_message);
    };

    let call = match open_call(ctx, &input, &mapping, &agent, direction, their_number).await {
        Some(call) => call,
        None => return ctx.hangup(&ctx.telephony.service_unavailable_message),
    };

    let action_url = match ctx
        .telephony
        .speech_callback_url(&call.id, &call.tenant_id, &call.agent_id)
    {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "invalid public url");
            return ctx.hangup(&ctx.telephony.service_unavailable_message);
        }
    };

    tracing::info!(
        call_id = %call.id,
        tenant_id = %call.tenant_id,
        agent_id = %call.agent_id,
        lead_id = ?call.lead_id,
        "greeting caller"
    );
    encode_greeting_and_gather(
        &agent.initial_greeting,
        &VoiceParams::from_agent(&agent),
        &GatherParams {
            action_url: action_url.to_string(),
            hints: ctx.telephony.hints(),
            no_response_message: ctx.telephony.greeting_no_response_message.clone(),
        },
    )
}

/// The mapped agent, or the hinted one when it belongs to the same tenant.
async fn resolve_agent(
    ctx: &FlowContext,
    mapping: &NumberMapping,
    agent_hint: Option<&str>,
) -> Option<AgentConfig> {
    let hinted = agent_hint.map(str::trim).filter(|id| !id.is_empty());
    if let Some(agent_id) = hinted {
        match ctx.directory.agent_config(agent_id).await {
            Ok(Some(agent)) if agent.tenant_id == mapping.tenant_id => return Some(agent),
            Ok(_) => {
                tracing::warn!(agent_id, tenant_id = %mapping.tenant_id, "ignoring agent hint from another tenant");
            }
            Err(e) => tracing::warn!(agent_id, error = %e, "agent hint lookup failed"),
        }
    }

    match ctx.directory.agent_config(&mapping.agent_id).await {
        Ok(Some(agent)) => Some(agent),
        Ok(None) => {
            tracing::warn!(agent_id = %mapping.agent_id, "agent configuration missing");
            None
        }
        Err(e) => {
            tracing::error!(agent_id = %mapping.agent_id, error = %e, "agent lookup failed");
            None
        }
    }
}

/// Creates the call record, or reuses it when the platform retried the
/// webhook for a call that is still open.
async fn open_call(
    ctx: &FlowContext,
    input: &CallStartInput,
    mapping: &NumberMapping,
    agent: &AgentConfig,
    direction: CallDirection,
    their_number: &str,
) -> Option<Call> {
    let external_sid = Some(input.call_sid.trim())
        .filter(|sid| !sid.is_empty())
        .map(str::to_string);

    if let Some(sid) = &external_sid {
        match ctx.calls.find_call_by_external_sid(sid).await {
            Ok(Some(call)) if call.finalized_at.is_none() => {
                tracing::info!(call_id = %call.id, call_sid = %sid, "call start retried, reusing call");
                return Some(call);
            }
            Ok(Some(call)) => {
                tracing::warn!(call_id = %call.id, call_sid = %sid, "call start for a finalized call");
                return None;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(call_sid = %sid, error = %e, "call lookup failed");
                return None;
            }
        }
    }

    let lead_id = find_lead(ctx, &mapping.tenant_id, their_number, input.lead_hint.as_deref()).await;

    match ctx
        .calls
        .create_call(NewCall {
            external_sid,
            tenant_id: mapping.tenant_id.clone(),
            agent_id: agent.agent_id.clone(),
            lead_id,
            direction,
            from_number: input.from.trim().to_string(),
            to_number: input.to.trim().to_string(),
            status: CallStatus::InProgress,
        })
        .await
    {
        Ok(call) => Some(call),
        Err(e) => {
            tracing::error!(call_sid = %input.call_sid, error = %e, "failed to create call");
            None
        }
    }
}

/// Lead lookups never block the call; failures just leave it unattached.
async fn find_lead(
    ctx: &FlowContext,
    tenant_id: &str,
    phone_number: &str,
    lead_hint: Option<&str>,
) -> Option<String> {
    if let Some(lead_id) = lead_hint.map(str::trim).filter(|id| !id.is_empty()) {
        match ctx.leads.get_lead(lead_id).await {
            Ok(Some(lead)) if lead.tenant_id == tenant_id => return Some(lead.id),
            Ok(_) => tracing::warn!(lead_id, tenant_id, "ignoring lead hint"),
            Err(e) => tracing::warn!(lead_id, error = %e, "lead hint lookup failed"),
        }
    }

    let phone_number = phone_number.trim();
    if phone_number.is_empty() {
        return None;
    }
    match ctx.leads.find_lead_by_phone(tenant_id, phone_number).await {
        Ok(lead) => lead.map(|l| l.id),
        Err(e) => {
            tracing::warn!(tenant_id, error = %e, "lead lookup failed");
            None
        }
    }
}
