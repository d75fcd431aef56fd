use serde::{Deserialize, Serialize};
use std::fmt;

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_sendgrid_api_base() -> String {
    "https://api.sendgrid.com".to_string()
}

fn default_calcom_api_base() -> String {
    "https://api.cal.com".to_string()
}

fn default_time_zone() -> String {
    "Europe/Paris".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Twilio REST credentials, used for SMS and outbound calls.
#[derive(Clone, Serialize, Deserialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default, skip_serializing)]
    pub auth_token: String,
    /// Sender number for SMS and caller id for outbound calls.
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_twilio_api_base(),
        }
    }
}

impl TwilioConfig {
    pub fn is_enabled(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SendGridConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default = "default_sendgrid_api_base")]
    pub api_base: String,
}

impl Default for SendGridConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: String::new(),
            from_name: None,
            api_base: default_sendgrid_api_base(),
        }
    }
}

impl SendGridConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.from_email.is_empty()
    }
}

impl fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"[REDACTED]")
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CalComConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    /// Event type bookings are created under.
    #[serde(default)]
    pub event_type_id: Option<u64>,
    /// IANA zone attached to the attendee.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_calcom_api_base")]
    pub api_base: String,
}

impl Default for CalComConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            event_type_id: None,
            time_zone: default_time_zone(),
            api_base: default_calcom_api_base(),
        }
    }
}

impl CalComConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && self.event_type_id.is_some()
    }
}

impl fmt::Debug for CalComConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalComConfig")
            .field("api_key", &"[REDACTED]")
            .field("event_type_id", &self.event_type_id)
            .field("time_zone", &self.time_zone)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// All outbound channel settings. Unconfigured channels are left out of
/// [`crate::Channels`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub twilio: TwilioConfig,
    #[serde(default)]
    pub sendgrid: SendGridConfig,
    #[serde(default)]
    pub calcom: CalComConfig,
    /// Endpoint receiving lead events as JSON.
    #[serde(default)]
    pub crm_webhook_url: Option<String>,
    /// Public TwiML endpoint fetched by the platform when an outbound call
    /// connects.
    #[serde(default)]
    pub outbound_twiml_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            twilio: TwilioConfig::default(),
            sendgrid: SendGridConfig::default(),
            calcom: CalComConfig::default(),
            crm_webhook_url: None,
            outbound_twiml_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_redacted() {
        let config = NotifyConfig {
            twilio: TwilioConfig {
                account_sid: "AC1".into(),
                auth_token: "tw-secret".into(),
                from_number: "+33100000000".into(),
                api_base: default_twilio_api_base(),
            },
            sendgrid: SendGridConfig {
                api_key: "sg-secret".into(),
                ..SendGridConfig::default()
            },
            calcom: CalComConfig {
                api_key: "cal-secret".into(),
                ..CalComConfig::default()
            },
            ..NotifyConfig::default()
        };
        let rendered = format!("{config:?}");
        for secret in ["tw-secret", "sg-secret", "cal-secret"] {
            assert!(!rendered.contains(secret), "{secret} leaked");
        }
    }

    #[test]
    fn channels_need_complete_credentials() {
        let mut twilio = TwilioConfig {
            account_sid: "AC1".into(),
            auth_token: "token".into(),
            ..TwilioConfig::default()
        };
        assert!(!twilio.is_enabled());
        twilio.from_number = "+33100000000".into();
        assert!(twilio.is_enabled());

        let calcom = CalComConfig {
            api_key: "key".into(),
            ..CalComConfig::default()
        };
        assert!(!calcom.is_enabled(), "event type id is required");
    }
}
