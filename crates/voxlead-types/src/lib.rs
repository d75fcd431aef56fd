//! Shared domain types for the voxlead call platform.
//!
//! Every crate in the workspace speaks in these types: calls and their
//! transcripts, leads, agent configuration, ingested datasets, and the
//! outcome enums reported by post-call workflows. Each persisted enum has a
//! single canonical string form (`as_str` / `FromStr`) that is also its serde
//! representation, so the database, the JSON API, and the logs never drift.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[macro_use]
mod macros;

mod analysis;
mod dataset;
mod lead;
mod outcome;

pub use analysis::{
    clamp_score, is_disqualifying_intent, AppointmentDetails, CallAnalysis, KeyInformation,
    LEAD_SCORE_THRESHOLD,
};
pub use dataset::{Dataset, DatasetStatus, SourceType};
pub use lead::{Lead, LeadStatus, LeadUpsert, UNKNOWN_PROSPECT};
pub use outcome::{ChannelOutcome, FollowUpStatus, FollowUpStrategy, OverallStatus};

/// Error returned when a string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// The enum being parsed (e.g. `"call status"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

string_enum! {
    /// Who said an utterance.
    Speaker, "speaker" {
        /// The person on the phone.
        Caller => "caller",
        /// The AI agent.
        Assistant => "assistant",
    }
}

string_enum! {
    /// Direction of a phone call relative to the platform.
    CallDirection, "call direction" {
        Inbound => "inbound",
        Outbound => "outbound",
    }
}

impl CallDirection {
    /// Maps a telephony `Direction` parameter to a call direction.
    ///
    /// Twilio reports `inbound`, `outbound-api` and `outbound-dial`; anything
    /// that starts with `outbound` is treated as outbound.
    pub fn from_telephony(direction: &str) -> Self {
        if direction.trim().to_ascii_lowercase().starts_with("outbound") {
            Self::Outbound
        } else {
            Self::Inbound
        }
    }
}

string_enum! {
    /// Lifecycle status of a call record.
    CallStatus, "call status" {
        Ringing => "ringing",
        InProgress => "in-progress",
        Completed => "completed",
        Failed => "failed",
    }
}

impl CallStatus {
    /// Returns `true` for statuses after which no more turns are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

string_enum! {
    /// Next step suggested by the conversational model after a turn.
    ///
    /// Shared by the speech segment handler and everything downstream that
    /// dispatches transfers or scheduling.
    CallAction, "call action" {
        Continue => "continue",
        End => "end",
        Transfer => "transfer",
        Schedule => "schedule",
    }
}

impl CallAction {
    /// Interprets a model-suggested action.
    ///
    /// Accepts both the short tags and the long `*_call` / `*_conversation`
    /// spellings. Anything unrecognized, or no suggestion at all, means the
    /// conversation continues.
    pub fn from_suggestion(suggestion: Option<&str>) -> Self {
        let Some(raw) = suggestion else {
            return Self::Continue;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "end" | "end_call" | "hangup" => Self::End,
            "transfer" | "transfer_call" => Self::Transfer,
            "schedule" | "schedule_appointment" => Self::Schedule,
            _ => Self::Continue,
        }
    }

    /// Whether the telephony response should hang up after the reply.
    pub fn ends_call(self) -> bool {
        self == Self::End
    }
}

/// One speaker-tagged line of a call transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

impl Utterance {
    pub fn caller(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Caller,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }
}

impl std::fmt::Display for Utterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}

/// Renders a transcript as newline-separated `speaker: text` lines.
pub fn render_transcript(utterances: &[Utterance]) -> String {
    utterances
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One phone conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Generator-assigned identifier (UUID v4).
    pub id: String,
    /// Telephony platform call SID, when the call came through a webhook.
    pub external_sid: Option<String>,
    pub tenant_id: String,
    pub agent_id: String,
    /// Attached once the caller is matched to (or becomes) a lead.
    pub lead_id: Option<String>,
    pub direction: CallDirection,
    pub from_number: String,
    pub to_number: String,
    pub status: CallStatus,
    /// Ordered, append-only.
    pub transcript: Vec<Utterance>,
    /// Replaced wholesale on every update.
    pub summary: String,
    pub intent: Option<String>,
    pub lead_score: Option<u8>,
    pub duration_seconds: u32,
    pub recording_url: Option<String>,
    /// Structured post-call analysis, once the call has ended.
    pub analysis: Option<CallAnalysis>,
    /// Creation timestamp (ISO 8601).
    pub created_at: String,
    /// Set when the call end handler finalizes the record.
    pub finalized_at: Option<String>,
}

impl Call {
    /// The number of the person on the other end of the line.
    ///
    /// For inbound calls that is the caller; for outbound calls it is the
    /// number that was dialed.
    pub fn counterpart_number(&self) -> Option<&str> {
        let number = match self.direction {
            CallDirection::Inbound => self.from_number.as_str(),
            CallDirection::Outbound => self.to_number.as_str(),
        };
        let number = number.trim();
        if number.is_empty() {
            None
        } else {
            Some(number)
        }
    }
}

/// Parameters for creating a new call record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCall {
    pub external_sid: Option<String>,
    pub tenant_id: String,
    pub agent_id: String,
    pub lead_id: Option<String>,
    pub direction: CallDirection,
    pub from_number: String,
    pub to_number: String,
    pub status: CallStatus,
}

/// Routes an inbound telephony number to a tenant and its agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberMapping {
    pub phone_number: String,
    pub tenant_id: String,
    pub agent_id: String,
}

/// Per-tenant assistant behavior. Read once at call start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub agent_id: String,
    pub tenant_id: String,
    pub system_prompt: String,
    /// Speech synthesis provider (e.g. `polly`, `elevenlabs`).
    pub voice_provider: String,
    /// Voice name passed to the telephony `<Say>` verb.
    pub voice_id: String,
    pub initial_greeting: String,
    /// BCP-47 language tag for speech synthesis and recognition.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en-US".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_action_accepts_long_and_short_spellings() {
        assert_eq!(CallAction::from_suggestion(Some("end")), CallAction::End);
        assert_eq!(CallAction::from_suggestion(Some("end_call")), CallAction::End);
        assert_eq!(
            CallAction::from_suggestion(Some("transfer_call")),
            CallAction::Transfer
        );
        assert_eq!(
            CallAction::from_suggestion(Some(" Schedule ")),
            CallAction::Schedule
        );
        assert_eq!(
            CallAction::from_suggestion(Some("continue_conversation")),
            CallAction::Continue
        );
    }

    #[test]
    fn call_action_defaults_to_continue() {
        assert_eq!(CallAction::from_suggestion(None), CallAction::Continue);
        assert_eq!(
            CallAction::from_suggestion(Some("dance")),
            CallAction::Continue
        );
        assert!(!CallAction::Transfer.ends_call());
        assert!(CallAction::End.ends_call());
    }

    #[test]
    fn call_status_string_codec() {
        assert_eq!(CallStatus::InProgress.as_str(), "in-progress");
        assert_eq!("completed".parse::<CallStatus>(), Ok(CallStatus::Completed));
        let err = "dialing".parse::<CallStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown call status: dialing");
    }

    #[test]
    fn call_status_serde_matches_as_str() {
        let json = serde_json::to_string(&CallStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        let back: CallStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CallStatus::InProgress);
    }

    #[test]
    fn direction_from_telephony() {
        assert_eq!(CallDirection::from_telephony("inbound"), CallDirection::Inbound);
        assert_eq!(
            CallDirection::from_telephony("outbound-api"),
            CallDirection::Outbound
        );
        assert_eq!(
            CallDirection::from_telephony("outbound-dial"),
            CallDirection::Outbound
        );
    }

    #[test]
    fn transcript_rendering() {
        let transcript = vec![
            Utterance::caller("I'd like to visit the flat"),
            Utterance::assistant("Sure, when suits you?"),
        ];
        assert_eq!(
            render_transcript(&transcript),
            "caller: I'd like to visit the flat\nassistant: Sure, when suits you?"
        );
    }

    #[test]
    fn counterpart_number_follows_direction() {
        let mut call = Call {
            id: "c1".into(),
            external_sid: None,
            tenant_id: "t1".into(),
            agent_id: "a1".into(),
            lead_id: None,
            direction: CallDirection::Inbound,
            from_number: "+33611111111".into(),
            to_number: "+33100000000".into(),
            status: CallStatus::InProgress,
            transcript: Vec::new(),
            summary: String::new(),
            intent: None,
            lead_score: None,
            duration_seconds: 0,
            recording_url: None,
            analysis: None,
            created_at: "2024-01-01 00:00:00".into(),
            finalized_at: None,
        };
        assert_eq!(call.counterpart_number(), Some("+33611111111"));

        call.direction = CallDirection::Outbound;
        assert_eq!(call.counterpart_number(), Some("+33100000000"));

        call.to_number = "  ".into();
        assert_eq!(call.counterpart_number(), None);
    }
}
