use crate::settings::{FollowUpTemplates, TelephonyConfig};
use std::sync::Arc;
use voxlead_notify::Channels;
use voxlead_store::{CallStore, Directory, LeadStore};
use voxlead_voice::{encode_hangup, ConversationalInference};

/// Everything a flow talks to.
#[derive(Clone)]
pub struct FlowContext {
    pub calls: Arc<dyn CallStore>,
    pub directory: Arc<dyn Directory>,
    pub leads: Arc<dyn LeadStore>,
    pub inference: Arc<dyn ConversationalInference>,
    pub channels: Channels,
    pub telephony: TelephonyConfig,
    pub templates: FollowUpTemplates,
}

impl FlowContext {
    /// Uses one store for calls, directory and leads.
    pub fn new<S>(
        store: Arc<S>,
        inference: Arc<dyn ConversationalInference>,
        channels: Channels,
        telephony: TelephonyConfig,
        templates: FollowUpTemplates,
    ) -> Self
    where
        S: CallStore + Directory + LeadStore + 'static,
    {
        Self {
            calls: store.clone(),
            directory: store.clone(),
            leads: store,
            inference,
            channels,
            telephony,
            templates,
        }
    }

    /// Apology and hang-up in the default voice.
    pub(crate) fn hangup(&self, message: &str) -> String {
        encode_hangup(
            message,
            &self.telephony.default_voice,
            Some(&self.telephony.default_language),
        )
    }
}
