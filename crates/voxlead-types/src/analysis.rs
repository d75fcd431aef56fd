//! Structured post-call analysis.

use serde::{Deserialize, Serialize};

/// Leads are only created or updated for calls scoring strictly above this.
pub const LEAD_SCORE_THRESHOLD: u8 = 20;

/// Intents for which no lead is ever created, whatever the score.
const DISQUALIFYING_INTENTS: &[&str] = &[
    "off-topic",
    "off_topic",
    "hors_sujet",
    "complaint",
    "plainte",
];

/// Returns `true` when the intent rules out lead creation.
pub fn is_disqualifying_intent(intent: &str) -> bool {
    let intent = intent.trim().to_ascii_lowercase();
    DISQUALIFYING_INTENTS.contains(&intent.as_str())
}

/// Clamps a model-produced score into `0..=100`.
///
/// Non-finite values collapse to 0.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Real-estate facts extracted from a conversation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyInformation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Whether an appointment came up during the call, and when.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentDetails {
    pub scheduled: bool,
    /// ISO 8601 datetimes discussed during the call.
    pub proposed_date_times: Vec<String>,
    /// ISO 8601 datetime explicitly agreed on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_date_time: Option<String>,
}

impl AppointmentDetails {
    /// The confirmed time, or else the first proposed one.
    pub fn preferred_time(&self) -> Option<&str> {
        self.confirmed_date_time
            .as_deref()
            .or_else(|| self.proposed_date_times.first().map(String::as_str))
    }
}

/// Full-transcript analysis produced at the end of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    #[serde(rename = "overallSummary")]
    pub summary: String,
    #[serde(rename = "intentDetected")]
    pub intent: String,
    /// Always within `0..=100`.
    pub lead_score: u8,
    #[serde(rename = "keyInformationExtracted", default)]
    pub key_info: KeyInformation,
    #[serde(rename = "nextStepsRecommended", default)]
    pub next_steps: Vec<String>,
    #[serde(rename = "appointmentDetails", default)]
    pub appointment: AppointmentDetails,
}

impl CallAnalysis {
    /// Minimal analysis recorded when the model produced nothing.
    pub fn failed() -> Self {
        Self {
            summary: "Call analysis failed.".to_string(),
            intent: "unknown".to_string(),
            lead_score: 0,
            key_info: KeyInformation::default(),
            next_steps: Vec::new(),
            appointment: AppointmentDetails::default(),
        }
    }

    /// Lead disposition policy: the intent must not be disqualifying and the
    /// score must be above [`LEAD_SCORE_THRESHOLD`].
    pub fn qualifies_for_lead(&self) -> bool {
        !is_disqualifying_intent(&self.intent) && self.lead_score > LEAD_SCORE_THRESHOLD
    }
}
