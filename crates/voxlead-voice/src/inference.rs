//! The conversational inference port.

use crate::error::InferenceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;
use voxlead_types::{CallAnalysis, Utterance};

/// Context for one conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub call_id: String,
    pub tenant_id: String,
    pub system_prompt: String,
    pub summary: String,
    pub transcript: Vec<Utterance>,
    /// Speech recognized by the telephony platform, if any.
    pub speech_text: Option<String>,
    /// Recording of the utterance, if any.
    pub audio_url: Option<String>,
}

/// What the model made of one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReply {
    /// The model's transcription of the caller; may be empty.
    #[serde(default, rename = "transcribedUserSpeech")]
    pub transcription: String,
    #[serde(default, rename = "aiResponseText")]
    pub reply: String,
    #[serde(default, rename = "newSummary")]
    pub summary: Option<String>,
    /// Free-form action tag, interpreted by `CallAction::from_suggestion`.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub call_id: String,
    pub tenant_id: String,
    /// Rendered `speaker: text` transcript.
    pub transcript: String,
}

/// Blocking request/response access to the language model.
///
/// `Ok(None)` means the model produced nothing usable; callers treat it the
/// same as an error.
#[async_trait]
pub trait ConversationalInference: Send + Sync {
    async fn respond(&self, request: &TurnRequest) -> Result<Option<TurnReply>, InferenceError>;

    async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Option<CallAnalysis>, InferenceError>;

    fn name(&self) -> &str;
}

/// Used when no model endpoint is configured. Never produces output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullInference;

#[async_trait]
impl ConversationalInference for NullInference {
    async fn respond(&self, _request: &TurnRequest) -> Result<Option<TurnReply>, InferenceError> {
        Ok(None)
    }

    async fn analyze(
        &self,
        _request: &AnalysisRequest,
    ) -> Result<Option<CallAnalysis>, InferenceError> {
        Ok(None)
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Replays queued outputs in order and records the requests it saw.
///
/// Once a queue is drained, further calls return `Ok(None)`.
#[derive(Debug, Default)]
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Result<Option<TurnReply>, InferenceError>>>,
    analyses: Mutex<VecDeque<Result<Option<CallAnalysis>, InferenceError>>>,
    turns_seen: Mutex<Vec<TurnRequest>>,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: TurnReply) -> Self {
        self.replies.get_mut().push_back(Ok(Some(reply)));
        self
    }

    pub fn with_turn_failure(mut self, error: InferenceError) -> Self {
        self.replies.get_mut().push_back(Err(error));
        self
    }

    pub fn with_analysis(mut self, analysis: CallAnalysis) -> Self {
        self.analyses.get_mut().push_back(Ok(Some(analysis)));
        self
    }

    pub fn with_analysis_failure(mut self, error: InferenceError) -> Self {
        self.analyses.get_mut().push_back(Err(error));
        self
    }

    /// Turn requests received so far.
    pub async fn turns_seen(&self) -> Vec<TurnRequest> {
        self.turns_seen.lock().await.clone()
    }
}

#[async_trait]
impl ConversationalInference for ScriptedInference {
    async fn respond(&self, request: &TurnRequest) -> Result<Option<TurnReply>, InferenceError> {
        self.turns_seen.lock().await.push(request.clone());
        self.replies.lock().await.pop_front().unwrap_or(Ok(None))
    }

    async fn analyze(
        &self,
        _request: &AnalysisRequest,
    ) -> Result<Option<CallAnalysis>, InferenceError> {
        self.analyses.lock().await.pop_front().unwrap_or(Ok(None))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
