//! Channel ports and the message types they carry.

use crate::calcom::CalComScheduler;
use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::sendgrid::SendGridEmail;
use crate::twilio::{TwilioDialer, TwilioSms};
use crate::webhook::WebhookCrm;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub duration_minutes: u32,
    pub location: Option<String>,
    pub description: Option<String>,
    pub attendee_name: String,
    pub attendee_email: Option<String>,
    pub attendee_phone: Option<String>,
    /// Agent user the booking is made for.
    pub organizer_id: Option<String>,
}

/// An AI call to place to a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundCall {
    pub tenant_id: String,
    pub lead_id: String,
    /// Agent to run the call with; defaults to the one mapped to our number.
    pub agent_id: Option<String>,
    pub to: String,
}

/// A lead event pushed to a tenant's CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmEvent {
    pub event: String,
    pub tenant_id: String,
    pub lead_id: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Sends a text message and returns the provider's message id.
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

#[async_trait]
pub trait CalendarScheduler: Send + Sync {
    /// Books the event and returns the calendar's event id.
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait OutboundDialer: Send + Sync {
    /// Starts the call and returns the telephony call SID.
    async fn place_call(&self, call: &OutboundCall) -> Result<String, NotifyError>;
}

#[async_trait]
pub trait CrmNotifier: Send + Sync {
    async fn notify(&self, event: &CrmEvent) -> Result<(), NotifyError>;
}

/// The configured channels. `None` means the channel is unavailable.
#[derive(Clone, Default)]
pub struct Channels {
    pub sms: Option<Arc<dyn SmsSender>>,
    pub email: Option<Arc<dyn EmailSender>>,
    pub calendar: Option<Arc<dyn CalendarScheduler>>,
    pub dialer: Option<Arc<dyn OutboundDialer>>,
    pub crm: Option<Arc<dyn CrmNotifier>>,
}

impl std::fmt::Debug for Channels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channels")
            .field("sms", &self.sms.is_some())
            .field("email", &self.email.is_some())
            .field("calendar", &self.calendar.is_some())
            .field("dialer", &self.dialer.is_some())
            .field("crm", &self.crm.is_some())
            .finish()
    }
}

impl Channels {
    /// Builds an HTTP client for every channel whose credentials are present.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut channels = Self::default();

        if config.twilio.is_enabled() {
            channels.sms = Some(Arc::new(TwilioSms::new(client.clone(), config.twilio.clone())));
            if let Some(twiml_url) = &config.outbound_twiml_url {
                channels.dialer = Some(Arc::new(TwilioDialer::new(
                    client.clone(),
                    config.twilio.clone(),
                    twiml_url,
                )?));
            }
        }
        if config.sendgrid.is_enabled() {
            channels.email = Some(Arc::new(SendGridEmail::new(
                client.clone(),
                config.sendgrid.clone(),
            )));
        }
        if config.calcom.is_enabled() {
            channels.calendar = Some(Arc::new(CalComScheduler::new(
                client.clone(),
                config.calcom.clone(),
            )));
        }
        if let Some(url) = config.crm_webhook_url.as_deref().filter(|u| !u.is_empty()) {
            channels.crm = Some(Arc::new(WebhookCrm::new(client, url)?));
        }

        tracing::info!(channels = ?channels, "notification channels configured");
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TwilioConfig;

    #[test]
    fn empty_config_yields_no_channels() {
        let channels = Channels::from_config(&NotifyConfig::default()).expect("channels");
        assert!(channels.sms.is_none());
        assert!(channels.email.is_none());
        assert!(channels.calendar.is_none());
        assert!(channels.dialer.is_none());
        assert!(channels.crm.is_none());
    }

    #[test]
    fn dialer_needs_twiml_url() {
        let mut config = NotifyConfig {
            twilio: TwilioConfig {
                account_sid: "AC1".into(),
                auth_token: "token".into(),
                from_number: "+33100000000".into(),
                ..TwilioConfig::default()
            },
            crm_webhook_url: Some("https://crm.example/hooks/leads".into()),
            ..NotifyConfig::default()
        };
        let channels = Channels::from_config(&config).expect("channels");
        assert!(channels.sms.is_some());
        assert!(channels.dialer.is_none());
        assert!(channels.crm.is_some());

        config.outbound_twiml_url = Some("https://voice.example/webhooks/voice".into());
        let channels = Channels::from_config(&config).expect("channels");
        assert!(channels.dialer.is_some());
    }
}
