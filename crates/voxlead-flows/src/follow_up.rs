//! Lead follow-up through one strategy.

use crate::context::FlowContext;
use serde::{Deserialize, Serialize};
use serde_json::json;
use voxlead_notify::{CrmEvent, EmailMessage, NotifyError, OutboundCall};
use voxlead_types::{ChannelOutcome, FollowUpStatus, FollowUpStrategy, Lead};
use voxlead_voice::escape_xml;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpInput {
    pub tenant_id: String,
    pub lead_id: String,
    #[serde(rename = "followUpStrategy")]
    pub strategy: FollowUpStrategy,
    #[serde(default)]
    pub message_template_id: Option<String>,
    #[serde(default)]
    pub custom_message: Option<String>,
    /// Agent to place a `schedule_ai_call` follow-up with.
    #[serde(default)]
    pub ai_agent_id: Option<String>,
    /// Extra data forwarded with a `webhook_crm` follow-up.
    #[serde(default)]
    pub crm_payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpOutcome {
    pub lead_id: String,
    pub strategy_applied: FollowUpStrategy,
    pub status: FollowUpStatus,
    pub channel_outcome: ChannelOutcome,
    pub details: String,
}

impl FollowUpOutcome {
    fn new(
        input: &FollowUpInput,
        status: FollowUpStatus,
        channel_outcome: ChannelOutcome,
        details: impl Into<String>,
    ) -> Self {
        Self {
            lead_id: input.lead_id.clone(),
            strategy_applied: input.strategy,
            status,
            channel_outcome,
            details: details.into(),
        }
    }

    fn skipped(input: &FollowUpInput, details: &str) -> Self {
        Self::new(input, FollowUpStatus::Skipped, ChannelOutcome::Skipped, details)
    }

    fn from_send(
        input: &FollowUpInput,
        result: Result<String, NotifyError>,
        success: FollowUpStatus,
    ) -> Self {
        match result {
            Ok(details) => Self::new(input, success, ChannelOutcome::Sent, details),
            Err(e) => {
                tracing::error!(lead_id = %input.lead_id, strategy = %input.strategy, error = %e, "follow-up failed");
                Self::new(input, FollowUpStatus::Failed, ChannelOutcome::Failed, e.to_string())
            }
        }
    }
}

pub async fn follow_up_lead(ctx: &FlowContext, input: FollowUpInput) -> FollowUpOutcome {
    let lead = match ctx.leads.get_lead(&input.lead_id).await {
        Ok(Some(lead)) if lead.tenant_id == input.tenant_id => lead,
        Ok(_) => {
            tracing::warn!(lead_id = %input.lead_id, tenant_id = %input.tenant_id, "follow-up for unknown lead");
            return FollowUpOutcome::new(
                &input,
                FollowUpStatus::Failed,
                ChannelOutcome::Skipped,
                "lead not found",
            );
        }
        Err(e) => {
            tracing::error!(lead_id = %input.lead_id, error = %e, "lead lookup failed");
            return FollowUpOutcome::new(
                &input,
                FollowUpStatus::Failed,
                ChannelOutcome::Skipped,
                "lead lookup failed",
            );
        }
    };

    let outcome = match input.strategy {
        FollowUpStrategy::SmsReminder => sms_reminder(ctx, &input, &lead).await,
        FollowUpStrategy::EmailInfo => email_info(ctx, &input, &lead).await,
        FollowUpStrategy::ScheduleAiCall => schedule_ai_call(ctx, &input, &lead).await,
        FollowUpStrategy::WebhookCrm => webhook_crm(ctx, &input, &lead).await,
    };

    if outcome.status.counts_as_contact() {
        if let Err(e) = ctx.leads.record_follow_up(&lead.id).await {
            tracing::warn!(lead_id = %lead.id, error = %e, "failed to stamp follow-up");
        }
    }
    tracing::info!(
        lead_id = %lead.id,
        strategy = %input.strategy,
        status = %outcome.status,
        "follow-up handled"
    );
    outcome
}

fn message(ctx: &FlowContext, input: &FollowUpInput, lead: &Lead, fallback: &str) -> String {
    ctx.templates.render(
        input.custom_message.as_deref(),
        input.message_template_id.as_deref(),
        fallback,
        &lead.full_name,
    )
}

async fn sms_reminder(ctx: &FlowContext, input: &FollowUpInput, lead: &Lead) -> FollowUpOutcome {
    let Some(sms) = &ctx.channels.sms else {
        return FollowUpOutcome::skipped(input, "sms channel not configured");
    };
    let phone = lead.phone_number.trim();
    if phone.is_empty() {
        return FollowUpOutcome::skipped(input, "lead has no phone number");
    }
    let body = message(ctx, input, lead, &ctx.templates.default_sms);
    let result = sms
        .send_sms(phone, &body)
        .await
        .map(|sid| format!("sms sent ({sid})"));
    FollowUpOutcome::from_send(input, result, FollowUpStatus::Success)
}

async fn email_info(ctx: &FlowContext, input: &FollowUpInput, lead: &Lead) -> FollowUpOutcome {
    let Some(email) = &ctx.channels.email else {
        return FollowUpOutcome::skipped(input, "email channel not configured");
    };
    let Some(address) = lead.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        return FollowUpOutcome::skipped(input, "lead has no email address");
    };
    let text = message(ctx, input, lead, &ctx.templates.default_email);
    let result = email
        .send_email(&EmailMessage {
            to: address.to_string(),
            to_name: Some(lead.full_name.clone()),
            subject: ctx.templates.email_subject.clone(),
            html_body: format!("<p>{}</p>", escape_xml(&text)),
        })
        .await
        .map(|()| "email sent".to_string());
    FollowUpOutcome::from_send(input, result, FollowUpStatus::Success)
}

async fn schedule_ai_call(
    ctx: &FlowContext,
    input: &FollowUpInput,
    lead: &Lead,
) -> FollowUpOutcome {
    let Some(dialer) = &ctx.channels.dialer else {
        return FollowUpOutcome::skipped(input, "outbound calling not configured");
    };
    let phone = lead.phone_number.trim();
    if phone.is_empty() {
        return FollowUpOutcome::skipped(input, "lead has no phone number");
    }
    let result = dialer
        .place_call(&OutboundCall {
            tenant_id: lead.tenant_id.clone(),
            lead_id: lead.id.clone(),
            agent_id: input.ai_agent_id.clone(),
            to: phone.to_string(),
        })
        .await
        .map(|sid| format!("ai call placed ({sid})"));
    FollowUpOutcome::from_send(input, result, FollowUpStatus::PendingCall)
}

async fn webhook_crm(ctx: &FlowContext, input: &FollowUpInput, lead: &Lead) -> FollowUpOutcome {
    let Some(crm) = &ctx.channels.crm else {
        return FollowUpOutcome::skipped(input, "crm webhook not configured");
    };
    let event = CrmEvent {
        event: "lead.follow_up".to_string(),
        tenant_id: lead.tenant_id.clone(),
        lead_id: lead.id.clone(),
        payload: json!({
            "lead": lead,
            "data": input.crm_payload.clone().unwrap_or(serde_json::Value::Null),
        }),
    };
    let result = crm
        .notify(&event)
        .await
        .map(|()| "crm notified".to_string());
    FollowUpOutcome::from_send(input, result, FollowUpStatus::Success)
}
