//! Telephony response encoder.
//!
//! Pure functions producing TwiML documents. Every caller-, model- or
//! tenant-supplied string is passed through [`escape_xml`] before it is
//! written, whether it ends up in element text or in an attribute.

use voxlead_types::{AgentConfig, CallAction};

/// Attributes of every `<Say>` verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceParams {
    pub voice: String,
    /// BCP-47 tag, also used for speech recognition.
    pub language: String,
}

impl VoiceParams {
    pub fn new(voice: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            language: language.into(),
        }
    }

    pub fn from_agent(agent: &AgentConfig) -> Self {
        Self::new(agent.voice_id.clone(), agent.language.clone())
    }
}

/// How the next utterance is collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatherParams {
    /// Callback the telephony platform posts the recognized speech to.
    pub action_url: String,
    /// Comma-separated recognition hints; empty or `None` omits the attribute.
    pub hints: Option<String>,
    /// Spoken, followed by a hang-up, when the caller says nothing.
    pub no_response_message: String,
}

/// Escapes `< > & ' "` for XML text and attribute values.
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn say(text: &str, voice: &VoiceParams) -> String {
    format!(
        r#"<Say voice="{}" language="{}">{}</Say>"#,
        escape_xml(&voice.voice),
        escape_xml(&voice.language),
        escape_xml(text)
    )
}

fn gather(voice: &VoiceParams, params: &GatherParams) -> String {
    let hints = match params.hints.as_deref().map(str::trim) {
        Some(hints) if !hints.is_empty() => format!(r#" hints="{}""#, escape_xml(hints)),
        _ => String::new(),
    };
    format!(
        r#"<Gather input="speech" action="{}" method="POST" speechTimeout="auto" language="{}"{}></Gather>{}<Hangup/>"#,
        escape_xml(&params.action_url),
        escape_xml(&voice.language),
        hints,
        say(&params.no_response_message, voice)
    )
}

/// Greets the caller and waits for the first utterance.
pub fn encode_greeting_and_gather(
    greeting: &str,
    voice: &VoiceParams,
    params: &GatherParams,
) -> String {
    format!(
        "<Response>{}{}</Response>",
        say(greeting, voice),
        gather(voice, params)
    )
}

/// Speaks a reply, then either gathers the next utterance or hangs up when
/// `action` ends the call.
pub fn encode_reply_and_gather(
    reply: &str,
    voice: &VoiceParams,
    params: &GatherParams,
    action: CallAction,
) -> String {
    let tail = if action.ends_call() {
        "<Hangup/>".to_string()
    } else {
        gather(voice, params)
    };
    format!("<Response>{}{}</Response>", say(reply, voice), tail)
}

/// Apologizes and hangs up. `language` is optional since the agent may be
/// unknown at this point.
pub fn encode_hangup(message: &str, voice: &str, language: Option<&str>) -> String {
    let language = language
        .map(|l| format!(r#" language="{}""#, escape_xml(l)))
        .unwrap_or_default();
    format!(
        r#"<Response><Say voice="{}"{}>{}</Say><Hangup/></Response>"#,
        escape_xml(voice),
        language,
        escape_xml(message)
    )
}
