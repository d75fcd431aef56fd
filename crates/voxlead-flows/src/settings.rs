//! Scripted phrases and follow-up templates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_speech_path() -> String {
    "/webhooks/speech".to_string()
}

fn default_speech_hints() -> String {
    "viewing, apartment, house, buy, rent, appointment, information, valuation".to_string()
}

fn default_voice() -> String {
    "alice".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_unmapped_number_message() -> String {
    "Sorry, this number is not in service.".to_string()
}

fn default_service_unavailable_message() -> String {
    "Sorry, a technical error occurred. Please try again later.".to_string()
}

fn default_agent_unavailable_message() -> String {
    "Sorry, the voice agent is not configured correctly.".to_string()
}

fn default_greeting_no_response() -> String {
    "I did not receive a response. Goodbye.".to_string()
}

fn default_turn_no_response() -> String {
    "I did not understand. Please try again. Goodbye.".to_string()
}

fn default_inference_fallback() -> String {
    "I'm sorry, I could not process your request. Could you repeat that?".to_string()
}

fn default_rephrase() -> String {
    "I did not quite understand, could you rephrase that please?".to_string()
}

fn default_inaudible_marker() -> String {
    "(inaudible)".to_string()
}

/// Telephony-facing settings for the call flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Base URL the telephony platform reaches this service at.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    #[serde(default = "default_speech_path")]
    pub speech_path: String,
    #[serde(default = "default_speech_hints")]
    pub speech_hints: String,
    /// Used when no agent is known yet.
    #[serde(default = "default_voice")]
    pub default_voice: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_unmapped_number_message")]
    pub unmapped_number_message: String,
    /// Spoken before hanging up when the call cannot be recorded or routed
    /// back to this service.
    #[serde(default = "default_service_unavailable_message")]
    pub service_unavailable_message: String,
    #[serde(default = "default_agent_unavailable_message")]
    pub agent_unavailable_message: String,
    /// Spoken when the caller stays silent after the greeting.
    #[serde(default = "default_greeting_no_response")]
    pub greeting_no_response_message: String,
    /// Spoken when the caller stays silent after a reply.
    #[serde(default = "default_turn_no_response")]
    pub turn_no_response_message: String,
    #[serde(default = "default_inference_fallback")]
    pub inference_fallback_reply: String,
    #[serde(default = "default_rephrase")]
    pub rephrase_reply: String,
    #[serde(default = "default_inaudible_marker")]
    pub inaudible_marker: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
            speech_path: default_speech_path(),
            speech_hints: default_speech_hints(),
            default_voice: default_voice(),
            default_language: default_language(),
            unmapped_number_message: default_unmapped_number_message(),
            service_unavailable_message: default_service_unavailable_message(),
            agent_unavailable_message: default_agent_unavailable_message(),
            greeting_no_response_message: default_greeting_no_response(),
            turn_no_response_message: default_turn_no_response(),
            inference_fallback_reply: default_inference_fallback(),
            rephrase_reply: default_rephrase(),
            inaudible_marker: default_inaudible_marker(),
        }
    }
}

impl TelephonyConfig {
    /// Where the speech of call `call_id` is posted to.
    pub fn speech_callback_url(
        &self,
        call_id: &str,
        tenant_id: &str,
        agent_id: &str,
    ) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.public_url)?.join(&self.speech_path)?;
        url.query_pairs_mut()
            .append_pair("callId", call_id)
            .append_pair("tenantId", tenant_id)
            .append_pair("agentId", agent_id);
        Ok(url)
    }

    /// Hints, or `None` when blank.
    pub fn hints(&self) -> Option<String> {
        let hints = self.speech_hints.trim();
        (!hints.is_empty()).then(|| hints.to_string())
    }
}

fn default_sms_template() -> String {
    "Hello {name}, we are following up on your property search. Reply to this message or call us back whenever suits you.".to_string()
}

fn default_email_subject() -> String {
    "Following up on your property search".to_string()
}

fn default_email_template() -> String {
    "Hello {name}, thank you for your interest. One of our advisors will be glad to help you with your project.".to_string()
}

/// Follow-up messages. `{name}` is replaced with the lead's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpTemplates {
    /// Named templates selectable per request.
    #[serde(default)]
    pub templates: HashMap<String, String>,
    #[serde(default = "default_sms_template")]
    pub default_sms: String,
    #[serde(default = "default_email_subject")]
    pub email_subject: String,
    #[serde(default = "default_email_template")]
    pub default_email: String,
}

impl Default for FollowUpTemplates {
    fn default() -> Self {
        Self {
            templates: HashMap::new(),
            default_sms: default_sms_template(),
            email_subject: default_email_subject(),
            default_email: default_email_template(),
        }
    }
}

impl FollowUpTemplates {
    /// A non-blank custom message wins, then the named template, then
    /// `fallback`.
    pub fn render(
        &self,
        custom: Option<&str>,
        template_id: Option<&str>,
        fallback: &str,
        name: &str,
    ) -> String {
        if let Some(custom) = custom.map(str::trim).filter(|c| !c.is_empty()) {
            return custom.to_string();
        }
        let template = match template_id {
            Some(id) => self.templates.get(id).map(String::as_str).unwrap_or_else(|| {
                tracing::warn!(template_id = id, "unknown follow-up template, using default");
                fallback
            }),
            None => fallback,
        };
        template.replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_url_is_serialized_with_query() {
        let config = TelephonyConfig {
            public_url: "https://voice.example.com/base/".into(),
            ..TelephonyConfig::default()
        };
        let url = config
            .speech_callback_url("call 1", "tenant&2", "agent-3")
            .expect("url");
        assert_eq!(
            url.as_str(),
            "https://voice.example.com/webhooks/speech?callId=call+1&tenantId=tenant%262&agentId=agent-3"
        );
    }

    #[test]
    fn invalid_public_url_is_an_error() {
        let config = TelephonyConfig {
            public_url: "not a url".into(),
            ..TelephonyConfig::default()
        };
        assert!(config.speech_callback_url("c", "t", "a").is_err());
    }

    #[test]
    fn blank_hints_are_dropped() {
        let config = TelephonyConfig {
            speech_hints: "  ".into(),
            ..TelephonyConfig::default()
        };
        assert_eq!(config.hints(), None);
        assert!(TelephonyConfig::default().hints().is_some());
    }

    #[test]
    fn template_precedence() {
        let mut templates = FollowUpTemplates::default();
        templates
            .templates
            .insert("visit".into(), "Hi {name}, still keen on a visit?".into());

        assert_eq!(
            templates.render(Some("Call me"), Some("visit"), "fallback", "Marie"),
            "Call me"
        );
        assert_eq!(
            templates.render(Some("  "), Some("visit"), "fallback", "Marie"),
            "Hi Marie, still keen on a visit?"
        );
        assert_eq!(
            templates.render(None, Some("missing"), "Bye {name}", "Marie"),
            "Bye Marie"
        );
        assert_eq!(templates.render(None, None, "Bye {name}", "Paul"), "Bye Paul");
    }
}
