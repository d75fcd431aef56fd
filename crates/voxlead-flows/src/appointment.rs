//! Appointment confirmation: calendar booking, SMS and email, then the
//! lead moves to appointment-scheduled.

use crate::context::FlowContext;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use voxlead_notify::{CalendarEvent, EmailMessage};
use voxlead_types::{ChannelOutcome, Lead, OverallStatus};
use voxlead_voice::escape_xml;

pub const DEFAULT_DURATION_MINUTES: u32 = 30;
pub const DEFAULT_APPOINTMENT_TYPE: &str = "Property viewing";
const LOCATION_TBC: &str = "to be confirmed";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentInput {
    pub tenant_id: String,
    pub lead_id: String,
    /// RFC 3339.
    pub appointment_date_time: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub agent_user_id: String,
    #[serde(default)]
    pub prospect_full_name: Option<String>,
    #[serde(default)]
    pub prospect_phone_number: Option<String>,
    #[serde(default)]
    pub prospect_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentOutcome {
    pub lead_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
    pub calendar_status: ChannelOutcome,
    pub sms_notification_status: ChannelOutcome,
    pub email_notification_status: ChannelOutcome,
    pub lead_status_updated: bool,
    pub overall_status: OverallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppointmentOutcome {
    fn rejected(lead_id: String, error: impl Into<String>) -> Self {
        Self {
            lead_id,
            calendar_event_id: None,
            calendar_status: ChannelOutcome::Skipped,
            sms_notification_status: ChannelOutcome::Skipped,
            email_notification_status: ChannelOutcome::Skipped,
            lead_status_updated: false,
            overall_status: OverallStatus::Failure,
            error: Some(error.into()),
        }
    }
}

/// Who the confirmation goes to, with request overrides applied.
struct Attendee {
    name: String,
    phone: Option<String>,
    email: Option<String>,
}

impl Attendee {
    fn resolve(lead: &Lead, input: &AppointmentInput) -> Self {
        Self {
            name: pick(input.prospect_full_name.as_deref(), Some(&lead.full_name))
                .unwrap_or_else(|| lead.full_name.clone()),
            phone: pick(input.prospect_phone_number.as_deref(), Some(&lead.phone_number)),
            email: pick(input.prospect_email.as_deref(), lead.email.as_deref()),
        }
    }
}

fn pick(preferred: Option<&str>, fallback: Option<&str>) -> Option<String> {
    preferred
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.map(str::trim).filter(|v| !v.is_empty()))
        .map(str::to_string)
}

/// `Monday 2 September 2024 at 15:30`.
pub fn format_appointment_time(start: &DateTime<FixedOffset>) -> String {
    start.format("%A %-d %B %Y at %H:%M").to_string()
}

pub async fn confirm_appointment(ctx: &FlowContext, input: AppointmentInput) -> AppointmentOutcome {
    let lead = match ctx.leads.get_lead(&input.lead_id).await {
        Ok(Some(lead)) if lead.tenant_id == input.tenant_id => lead,
        Ok(_) => {
            tracing::warn!(lead_id = %input.lead_id, tenant_id = %input.tenant_id, "appointment for unknown lead");
            return AppointmentOutcome::rejected(input.lead_id, "lead not found");
        }
        Err(e) => {
            tracing::error!(lead_id = %input.lead_id, error = %e, "lead lookup failed");
            return AppointmentOutcome::rejected(input.lead_id, "lead lookup failed");
        }
    };
    let start = match DateTime::parse_from_rfc3339(input.appointment_date_time.trim()) {
        Ok(start) => start,
        Err(e) => {
            tracing::warn!(lead_id = %lead.id, error = %e, "invalid appointment time");
            return AppointmentOutcome::rejected(lead.id, "invalid appointment date time");
        }
    };

    let attendee = Attendee::resolve(&lead, &input);
    let appointment_type = input
        .appointment_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_APPOINTMENT_TYPE)
        .to_string();
    let location = input
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);
    let when = format_appointment_time(&start);

    let (calendar_status, calendar_event_id) = match &ctx.channels.calendar {
        Some(calendar) => {
            let event = CalendarEvent {
                title: format!("{appointment_type} with {}", attendee.name),
                start,
                duration_minutes: input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES),
                location: location.clone(),
                description: lead.interest.clone(),
                attendee_name: attendee.name.clone(),
                attendee_email: attendee.email.clone(),
                attendee_phone: attendee.phone.clone(),
                organizer_id: Some(input.agent_user_id.clone()),
            };
            match calendar.create_event(&event).await {
                Ok(id) => (ChannelOutcome::Sent, Some(id)),
                Err(e) => {
                    tracing::error!(lead_id = %lead.id, error = %e, "calendar booking failed");
                    (ChannelOutcome::Failed, None)
                }
            }
        }
        None => {
            tracing::warn!(lead_id = %lead.id, "calendar not configured");
            (ChannelOutcome::Skipped, None)
        }
    };

    let location_text = location.as_deref().unwrap_or(LOCATION_TBC);
    let sms_status = match (&ctx.channels.sms, &attendee.phone) {
        (Some(sms), Some(phone)) => {
            let body = format!(
                "Hello {}, your appointment ({appointment_type}) is confirmed for {when}. Location: {location_text}.",
                attendee.name
            );
            match sms.send_sms(phone, &body).await {
                Ok(_) => ChannelOutcome::Sent,
                Err(e) => {
                    tracing::error!(lead_id = %lead.id, error = %e, "confirmation sms failed");
                    ChannelOutcome::Failed
                }
            }
        }
        _ => ChannelOutcome::Skipped,
    };

    let email_status = match (&ctx.channels.email, &attendee.email) {
        (Some(email), Some(address)) => {
            let message = EmailMessage {
                to: address.clone(),
                to_name: Some(attendee.name.clone()),
                subject: format!("Appointment confirmed: {appointment_type} on {when}"),
                html_body: confirmation_html(
                    &attendee.name,
                    &appointment_type,
                    &when,
                    location_text,
                    calendar_event_id.as_deref(),
                ),
            };
            match email.send_email(&message).await {
                Ok(()) => ChannelOutcome::Sent,
                Err(e) => {
                    tracing::error!(lead_id = %lead.id, error = %e, "confirmation email failed");
                    ChannelOutcome::Failed
                }
            }
        }
        _ => ChannelOutcome::Skipped,
    };

    let lead_status_updated = match ctx
        .leads
        .schedule_appointment(&lead.id, &start.to_rfc3339(), calendar_event_id.as_deref())
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(lead_id = %lead.id, error = %e, "failed to mark lead scheduled");
            false
        }
    };

    let overall_status = OverallStatus::from_outcomes(&[sms_status, email_status], calendar_status);
    tracing::info!(
        lead_id = %lead.id,
        calendar = %calendar_status,
        sms = %sms_status,
        email = %email_status,
        overall = %overall_status,
        "appointment confirmed"
    );

    AppointmentOutcome {
        lead_id: lead.id,
        calendar_event_id,
        calendar_status,
        sms_notification_status: sms_status,
        email_notification_status: email_status,
        lead_status_updated,
        overall_status,
        error: None,
    }
}

fn confirmation_html(
    name: &str,
    appointment_type: &str,
    when: &str,
    location: &str,
    booking_id: Option<&str>,
) -> String {
    let mut html = format!(
        "<p>Hello {},</p><p>Your appointment ({}) is confirmed for <strong>{}</strong>.</p><p><strong>Location:</strong> {}</p>",
        escape_xml(name),
        escape_xml(appointment_type),
        escape_xml(when),
        escape_xml(location),
    );
    if let Some(id) = booking_id {
        html.push_str(&format!("<p>Booking reference: {}</p>", escape_xml(id)));
    }
    html.push_str("<p>Kind regards</p>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_local_time() {
        let start = DateTime::parse_from_rfc3339("2024-09-02T15:30:00+02:00").expect("date");
        assert_eq!(format_appointment_time(&start), "Monday 2 September 2024 at 15:30");
    }

    #[test]
    fn html_escapes_every_field() {
        let html = confirmation_html("<b>Eve</b>", "Visit & coffee", "soon", "to be confirmed", None);
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(html.contains("Visit &amp; coffee"));
        assert!(!html.contains("Booking reference"));
    }

    #[test]
    fn overrides_win_over_lead_fields() {
        let lead = Lead {
            id: "lead-1".into(),
            tenant_id: "tenant-1".into(),
            full_name: "Unknown prospect".into(),
            phone_number: "+33611111111".into(),
            email: None,
            status: voxlead_types::LeadStatus::ToContact,
            score: 60,
            interest: None,
            last_call_id: None,
            preferred_appointment_time: None,
            calendar_event_id: None,
            last_follow_up_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let input = AppointmentInput {
            prospect_full_name: Some("Marie Dupont".into()),
            prospect_email: Some(" marie@example.com ".into()),
            prospect_phone_number: Some("  ".into()),
            ..AppointmentInput::default()
        };
        let attendee = Attendee::resolve(&lead, &input);
        assert_eq!(attendee.name, "Marie Dupont");
        assert_eq!(attendee.phone.as_deref(), Some("+33611111111"));
        assert_eq!(attendee.email.as_deref(), Some("marie@example.com"));
    }
}
