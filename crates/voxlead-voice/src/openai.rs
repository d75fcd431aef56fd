//! OpenAI-compatible chat completion client.

use crate::config::InferenceConfig;
use crate::error::InferenceError;
use crate::inference::{AnalysisRequest, ConversationalInference, TurnReply, TurnRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use voxlead_types::{
    clamp_score, render_transcript, AppointmentDetails, CallAnalysis, KeyInformation,
};

const TURN_INSTRUCTIONS: &str = "\
You are answering a live phone call. Reply with a single JSON object and nothing else:
{\"transcribedUserSpeech\": string, \"aiResponseText\": string, \"newSummary\": string | null, \"action\": \"continue\" | \"end\" | \"transfer\" | \"schedule\"}
- transcribedUserSpeech: what the caller just said.
- aiResponseText: your spoken reply. Keep it short; it is read aloud.
- newSummary: an updated summary of the conversation, or null to keep the current one.
- action: \"end\" only when the caller is done.";

const ANALYSIS_INSTRUCTIONS: &str = "\
You analyze real-estate phone call transcripts. Reply with a single JSON object and nothing else:
{\"overallSummary\": string, \"intentDetected\": string, \"leadScore\": number 0-100,
 \"keyInformationExtracted\": {\"propertyName\", \"propertyType\", \"budgetRange\", \"desiredLocation\",
   \"numberOfBedrooms\", \"timeline\", \"contactName\", \"phoneNumber\", \"email\"},
 \"nextStepsRecommended\": [string],
 \"appointmentDetails\": {\"scheduled\": bool, \"proposedDateTimes\": [ISO 8601], \"confirmedDateTime\": ISO 8601 | null}}
Use intent \"off-topic\" for unrelated calls and \"complaint\" for complaints.
Only extract information that is present in the transcript.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Analysis as the model writes it; the score is clamped on conversion.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    #[serde(default)]
    overall_summary: String,
    #[serde(default)]
    intent_detected: String,
    #[serde(default)]
    lead_score: f64,
    #[serde(default)]
    key_information_extracted: KeyInformation,
    #[serde(default)]
    next_steps_recommended: Vec<String>,
    #[serde(default)]
    appointment_details: AppointmentDetails,
}

impl From<RawAnalysis> for CallAnalysis {
    fn from(raw: RawAnalysis) -> Self {
        Self {
            summary: raw.overall_summary,
            intent: raw.intent_detected,
            lead_score: clamp_score(raw.lead_score),
            key_info: raw.key_information_extracted,
            next_steps: raw.next_steps_recommended,
            appointment: raw.appointment_details,
        }
    }
}

/// [`ConversationalInference`] over `/v1/chat/completions` in JSON mode.
#[derive(Debug, Clone)]
pub struct OpenAiInference {
    client: Client,
    config: InferenceConfig,
}

impl OpenAiInference {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        if !config.is_enabled() {
            return Err(InferenceError::Config(
                "inference api_url and api_key must be set".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn complete_json(&self, messages: Vec<ChatMessage>) -> Result<Option<String>, InferenceError> {
        let url = format!("{}/v1/chat/completions", self.config.api_url.trim_end_matches('/'));
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| strip_code_fence(&c).to_string())
            .filter(|c| !c.is_empty());

        debug!(model = %self.config.model, has_content = content.is_some(), "chat completion received");
        Ok(content)
    }
}

/// Models sometimes wrap JSON in a markdown fence despite JSON mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn turn_context(request: &TurnRequest) -> String {
    let mut context = String::new();
    if !request.summary.trim().is_empty() {
        context.push_str("Conversation summary so far:\n");
        context.push_str(&request.summary);
        context.push_str("\n\n");
    }
    if !request.transcript.is_empty() {
        context.push_str("Transcript so far:\n");
        context.push_str(&render_transcript(&request.transcript));
        context.push_str("\n--- end of transcript ---\n\n");
    }
    match request.speech_text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            context.push_str("The caller just said: ");
            context.push_str(text);
        }
        _ => context.push_str("The caller's speech was not recognized."),
    }
    if let Some(audio) = &request.audio_url {
        context.push_str("\nRecording of the utterance: ");
        context.push_str(audio);
    }
    context
}

#[async_trait]
impl ConversationalInference for OpenAiInference {
    async fn respond(&self, request: &TurnRequest) -> Result<Option<TurnReply>, InferenceError> {
        let messages = vec![
            ChatMessage::system(format!("{}\n\n{}", request.system_prompt, TURN_INSTRUCTIONS)),
            ChatMessage::user(turn_context(request)),
        ];
        let Some(content) = self.complete_json(messages).await? else {
            return Ok(None);
        };
        let reply: TurnReply = serde_json::from_str(&content)
            .map_err(|e| InferenceError::InvalidOutput(format!("turn reply: {e}")))?;
        Ok(Some(reply))
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Option<CallAnalysis>, InferenceError> {
        let messages = vec![
            ChatMessage::system(ANALYSIS_INSTRUCTIONS),
            ChatMessage::user(format!("Transcript:\n{}", request.transcript)),
        ];
        let Some(content) = self.complete_json(messages).await? else {
            return Ok(None);
        };
        let raw: RawAnalysis = serde_json::from_str(&content)
            .map_err(|e| InferenceError::InvalidOutput(format!("call analysis: {e}")))?;
        Ok(Some(raw.into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxlead_types::Utterance;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn raw_analysis_clamps_score() {
        let raw: RawAnalysis = serde_json::from_str(
            r#"{"overallSummary":"Wants a visit","intentDetected":"prise_rdv_visite","leadScore":140.2,
                "keyInformationExtracted":{"contactName":"Marie","numberOfBedrooms":3},
                "appointmentDetails":{"scheduled":true,"proposedDateTimes":["2024-09-01T10:00:00Z"]}}"#,
        )
        .expect("parse");
        let analysis = CallAnalysis::from(raw);
        assert_eq!(analysis.lead_score, 100);
        assert_eq!(analysis.key_info.contact_name.as_deref(), Some("Marie"));
        assert_eq!(analysis.key_info.number_of_bedrooms, Some(3));
        assert!(analysis.appointment.scheduled);
    }

    #[test]
    fn turn_context_includes_history() {
        let request = TurnRequest {
            call_id: "c1".into(),
            tenant_id: "t1".into(),
            system_prompt: String::new(),
            summary: "Looking for a flat".into(),
            transcript: vec![Utterance::caller("hello")],
            speech_text: Some("in Lyon".into()),
            audio_url: None,
        };
        let context = turn_context(&request);
        assert!(context.contains("Looking for a flat"));
        assert!(context.contains("caller: hello"));
        assert!(context.ends_with("The caller just said: in Lyon"));
    }

    #[test]
    fn disabled_config_is_rejected() {
        assert!(matches!(
            OpenAiInference::new(InferenceConfig::default()),
            Err(InferenceError::Config(_))
        ));
    }
}
