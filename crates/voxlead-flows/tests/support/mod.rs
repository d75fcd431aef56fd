//! Shared fixtures: a migrated SQLite store and recording channel fakes.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use voxlead_db::{create_pool, run_migrations, DbRuntimeSettings};
use voxlead_flows::{FlowContext, FollowUpTemplates, TelephonyConfig};
use voxlead_notify::{
    CalendarEvent, CalendarScheduler, Channels, CrmEvent, CrmNotifier, EmailMessage, EmailSender,
    NotifyError, OutboundCall, OutboundDialer, SmsSender,
};
use voxlead_store::{Directory, SqliteStore};
use voxlead_types::{AgentConfig, NumberMapping};
use voxlead_voice::ConversationalInference;

pub const TENANT: &str = "tenant-1";
pub const AGENT: &str = "agent-1";
pub const OUR_NUMBER: &str = "+33100000000";
pub const CALLER: &str = "+33611111111";

pub fn store(file: &tempfile::NamedTempFile) -> Arc<SqliteStore> {
    let path = file.path().to_str().expect("utf-8 path");
    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    run_migrations(&pool.get().expect("connection")).expect("migrations");
    Arc::new(SqliteStore::new(pool))
}

/// Maps [`OUR_NUMBER`] to [`TENANT`] and its agent.
pub async fn seed_directory(store: &SqliteStore) {
    store
        .put_agent(AgentConfig {
            agent_id: AGENT.into(),
            tenant_id: TENANT.into(),
            system_prompt: "You are a real-estate assistant.".into(),
            voice_provider: "polly".into(),
            voice_id: "Polly.Celine".into(),
            initial_greeting: "Hello, how can I help?".into(),
            language: "fr-FR".into(),
        })
        .await
        .expect("agent");
    store
        .put_number(NumberMapping {
            phone_number: OUR_NUMBER.into(),
            tenant_id: TENANT.into(),
            agent_id: AGENT.into(),
        })
        .await
        .expect("mapping");
}

pub fn context(
    store: Arc<SqliteStore>,
    inference: Arc<dyn ConversationalInference>,
    channels: Channels,
) -> FlowContext {
    let telephony = TelephonyConfig {
        public_url: "https://voice.example.com".into(),
        ..TelephonyConfig::default()
    };
    FlowContext::new(store, inference, channels, telephony, FollowUpTemplates::default())
}

fn failure(service: &'static str) -> NotifyError {
    NotifyError::Api {
        service,
        status: 500,
        message: "upstream unavailable".into(),
    }
}

#[derive(Default)]
pub struct RecordingSms {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, NotifyError> {
        if self.fail {
            return Err(failure("twilio"));
        }
        self.sent
            .lock()
            .expect("lock")
            .push((to.to_string(), body.to_string()));
        Ok("SM123".into())
    }
}

#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingEmail {
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("lock").clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().expect("lock").push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingCalendar {
    pub events: Mutex<Vec<CalendarEvent>>,
}

#[async_trait]
impl CalendarScheduler for RecordingCalendar {
    async fn create_event(&self, event: &CalendarEvent) -> Result<String, NotifyError> {
        self.events.lock().expect("lock").push(event.clone());
        Ok("booking-42".into())
    }
}

#[derive(Default)]
pub struct RecordingDialer {
    pub calls: Mutex<Vec<OutboundCall>>,
}

#[async_trait]
impl OutboundDialer for RecordingDialer {
    async fn place_call(&self, call: &OutboundCall) -> Result<String, NotifyError> {
        self.calls.lock().expect("lock").push(call.clone());
        Ok("CA999".into())
    }
}

#[derive(Default)]
pub struct RecordingCrm {
    pub events: Mutex<Vec<CrmEvent>>,
}

#[async_trait]
impl CrmNotifier for RecordingCrm {
    async fn notify(&self, event: &CrmEvent) -> Result<(), NotifyError> {
        self.events.lock().expect("lock").push(event.clone());
        Ok(())
    }
}
