//! One conversational turn: caller speech in, agent reply out.
//!
//! A turn is not idempotent. If the platform retries the webhook, the model
//! is asked again and a second pair of utterances is appended.

use crate::context::FlowContext;
use serde::{Deserialize, Serialize};
use voxlead_types::{AgentConfig, Call, CallAction, Utterance};
use voxlead_voice::{encode_reply_and_gather, GatherParams, TurnReply, TurnRequest, VoiceParams};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechSegmentInput {
    pub call_id: String,
    pub tenant_id: String,
    pub agent_id: Option<String>,
    /// Speech recognized by the telephony platform.
    pub speech_text: Option<String>,
    pub confidence: Option<f32>,
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSegmentOutcome {
    pub reply: String,
    pub transcript: Vec<Utterance>,
    pub summary: String,
    pub action: CallAction,
    /// `false` when the turn could not be stored; `transcript` is then a
    /// best-effort copy.
    pub persisted: bool,
    #[serde(skip)]
    pub twiml: String,
}

/// Runs one turn. Always yields TwiML, even when the call is unknown.
pub async fn handle_speech_segment(
    ctx: &FlowContext,
    input: SpeechSegmentInput,
) -> SpeechSegmentOutcome {
    let call = match ctx.calls.get_call(&input.call_id).await {
        Ok(Some(call)) if call.tenant_id == input.tenant_id => call,
        Ok(_) => {
            tracing::warn!(call_id = %input.call_id, tenant_id = %input.tenant_id, "speech for unknown call");
            return terminal(ctx, &ctx.telephony.service_unavailable_message);
        }
        Err(e) => {
            tracing::error!(call_id = %input.call_id, error = %e, "call lookup failed");
            return terminal(ctx, &ctx.telephony.service_unavailable_message);
        }
    };

    let agent_id = input.agent_id.as_deref().unwrap_or(&call.agent_id);
    let agent = match ctx.directory.agent_config(agent_id).await {
        Ok(agent) => agent,
        Err(e) => {
            tracing::warn!(call_id = %call.id, agent_id, error = %e, "agent lookup failed");
            None
        }
    };
    let voice = agent.as_ref().map(VoiceParams::from_agent).unwrap_or_else(|| {
        VoiceParams::new(
            ctx.telephony.default_voice.clone(),
            ctx.telephony.default_language.clone(),
        )
    });

    let gather = match ctx
        .telephony
        .speech_callback_url(&call.id, &call.tenant_id, agent_id)
    {
        Ok(url) => GatherParams {
            action_url: url.to_string(),
            hints: ctx.telephony.hints(),
            no_response_message: ctx.telephony.turn_no_response_message.clone(),
        },
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "invalid public url");
            return terminal(ctx, &ctx.telephony.service_unavailable_message);
        }
    };

    let speech_text = input
        .speech_text
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    tracing::debug!(call_id = %call.id, confidence = ?input.confidence, "speech received");

    let Some(turn) = ask_model(ctx, &call, agent.as_ref(), speech_text.clone(), input.audio_url).await
    else {
        let reply = ctx.telephony.inference_fallback_reply.clone();
        let twiml = encode_reply_and_gather(&reply, &voice, &gather, CallAction::Continue);
        return SpeechSegmentOutcome {
            reply,
            transcript: call.transcript,
            summary: call.summary,
            action: CallAction::Continue,
            persisted: false,
            twiml,
        };
    };

    let caller_text = Some(turn.transcription.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or(speech_text)
        .unwrap_or_else(|| ctx.telephony.inaudible_marker.clone());
    let reply = Some(turn.reply.trim())
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| ctx.telephony.rephrase_reply.clone());
    let new_summary = turn
        .summary
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let action = CallAction::from_suggestion(turn.action.as_deref());

    let pair = vec![Utterance::caller(caller_text), Utterance::assistant(reply.clone())];
    let (transcript, persisted) = match ctx
        .calls
        .append_turn(&call.id, pair.clone(), new_summary.clone())
        .await
    {
        Ok(transcript) => (transcript, true),
        Err(e) => {
            tracing::error!(call_id = %call.id, error = %e, "failed to store turn");
            let mut transcript = call.transcript;
            transcript.extend(pair);
            (transcript, false)
        }
    };
    let summary = new_summary.unwrap_or(call.summary);

    tracing::info!(
        call_id = %call.id,
        action = %action,
        utterances = transcript.len(),
        "turn completed"
    );
    let twiml = encode_reply_and_gather(&reply, &voice, &gather, action);
    SpeechSegmentOutcome {
        reply,
        transcript,
        summary,
        action,
        persisted,
        twiml,
    }
}

async fn ask_model(
    ctx: &FlowContext,
    call: &Call,
    agent: Option<&AgentConfig>,
    speech_text: Option<String>,
    audio_url: Option<String>,
) -> Option<TurnReply> {
    let request = TurnRequest {
        call_id: call.id.clone(),
        tenant_id: call.tenant_id.clone(),
        system_prompt: agent.map(|a| a.system_prompt.clone()).unwrap_or_default(),
        summary: call.summary.clone(),
        transcript: call.transcript.clone(),
        speech_text,
        audio_url,
    };
    match ctx.inference.respond(&request).await {
        Ok(Some(turn)) => Some(turn),
        Ok(None) => {
            tracing::warn!(call_id = %call.id, model = ctx.inference.name(), "model returned no reply");
            None
        }
        Err(e) => {
            tracing::warn!(call_id = %call.id, error = %e, "model request failed");
            None
        }
    }
}

fn terminal(ctx: &FlowContext, message: &str) -> SpeechSegmentOutcome {
    SpeechSegmentOutcome {
        reply: message.to_string(),
        transcript: Vec::new(),
        summary: String::new(),
        action: CallAction::End,
        persisted: false,
        twiml: ctx.hangup(message),
    }
}
