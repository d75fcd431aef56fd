//! Voice edge of the call lifecycle.
//!
//! Two concerns live here: encoding telephony responses (TwiML) that keep a
//! call alive between webhook invocations, and the [`ConversationalInference`]
//! port through which the flows talk to the language model. The port has an
//! OpenAI-compatible HTTP implementation, a [`NullInference`] used when no
//! endpoint is configured, and a [`ScriptedInference`] fake for tests.

pub mod config;
pub mod error;
pub mod inference;
pub mod openai;
pub mod twiml;

pub use config::InferenceConfig;
pub use error::InferenceError;
pub use inference::{
    AnalysisRequest, ConversationalInference, NullInference, ScriptedInference, TurnReply,
    TurnRequest,
};
pub use openai::OpenAiInference;
pub use twiml::{
    encode_greeting_and_gather, encode_hangup, encode_reply_and_gather, escape_xml, GatherParams,
    VoiceParams,
};
