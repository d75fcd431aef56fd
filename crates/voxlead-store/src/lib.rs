//! Persistence ports for the call lifecycle and their SQLite implementation.
//!
//! The flows crate only ever sees the async traits defined here
//! ([`CallStore`], [`Directory`], [`LeadStore`], [`DatasetStore`]). The
//! production implementation is [`SqliteStore`], which runs every statement on
//! a blocking thread via `tokio::task::spawn_blocking`.
//!
//! The synchronous `&Connection` functions in [`calls`], [`directory`],
//! [`leads`] and [`datasets`] do the actual SQL work and can be used directly
//! from code that already holds a connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use voxlead_types::{
    AgentConfig, Call, CallAnalysis, CallStatus, Dataset, DatasetStatus, Lead, LeadUpsert,
    NewCall, NumberMapping, ParseEnumError, Utterance,
};

pub mod calls;
pub mod datasets;
pub mod directory;
pub mod leads;
mod sqlite;

pub use sqlite::SqliteStore;

/// Errors returned by every store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// The call was already finalized; its transcript is closed.
    #[error("call already finalized: {0}")]
    CallFinalized(String),
    #[error("illegal dataset transition {from} -> {to}")]
    InvalidTransition {
        from: DatasetStatus,
        to: DatasetStatus,
    },
    #[error("blocking task failed: {0}")]
    Join(String),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Reads a text column holding a canonical enum label.
pub(crate) fn enum_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e: ParseEnumError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Everything Call End writes when it closes a call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFinalization {
    pub status: CallStatus,
    /// Utterances not yet persisted, appended before the call is closed.
    pub transcript_tail: Vec<Utterance>,
    pub summary: String,
    pub intent: Option<String>,
    pub lead_score: u8,
    pub analysis: Option<CallAnalysis>,
    pub duration_seconds: u32,
    pub recording_url: Option<String>,
}

/// Result of a lead upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadWrite {
    pub lead_id: String,
    /// `false` when an existing `(tenant, phone)` row was updated.
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDataset {
    pub tenant_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub source_type: String,
}

/// A guarded status change plus the fields that change with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetUpdate {
    pub status: DatasetStatus,
    pub vector_count: Option<u32>,
    pub content_preview: Option<String>,
    pub error_message: Option<String>,
}

impl DatasetUpdate {
    pub fn status(status: DatasetStatus) -> Self {
        Self {
            status,
            vector_count: None,
            content_preview: None,
            error_message: None,
        }
    }
}

/// Call records and their append-only transcripts.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Creates a call with an empty transcript and summary.
    async fn create_call(&self, call: NewCall) -> Result<Call, StoreError>;

    async fn get_call(&self, call_id: &str) -> Result<Option<Call>, StoreError>;

    /// Looks a call up by its telephony SID.
    async fn find_call_by_external_sid(&self, sid: &str) -> Result<Option<Call>, StoreError>;

    /// Atomically appends utterances and, when given, replaces the summary.
    ///
    /// Returns the full transcript as committed, which includes any turns
    /// appended concurrently by other requests.
    async fn append_turn(
        &self,
        call_id: &str,
        utterances: Vec<Utterance>,
        summary: Option<String>,
    ) -> Result<Vec<Utterance>, StoreError>;

    /// Closes the call. Fails with [`StoreError::CallFinalized`] when it was
    /// already closed.
    async fn finalize_call(
        &self,
        call_id: &str,
        finalization: CallFinalization,
    ) -> Result<(), StoreError>;

    async fn attach_lead(&self, call_id: &str, lead_id: &str) -> Result<(), StoreError>;
}

/// Number routing and agent configuration.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn lookup_number(&self, phone_number: &str)
        -> Result<Option<NumberMapping>, StoreError>;

    async fn agent_config(&self, agent_id: &str) -> Result<Option<AgentConfig>, StoreError>;

    async fn put_number(&self, mapping: NumberMapping) -> Result<(), StoreError>;

    async fn put_agent(&self, config: AgentConfig) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>, StoreError>;

    async fn find_lead_by_phone(
        &self,
        tenant_id: &str,
        phone_number: &str,
    ) -> Result<Option<Lead>, StoreError>;

    /// Creates or updates the lead keyed by `(tenant_id, phone_number)` in a
    /// single statement.
    async fn upsert_lead(&self, upsert: LeadUpsert) -> Result<LeadWrite, StoreError>;

    /// Moves the lead to appointment-scheduled with the confirmed time.
    async fn schedule_appointment(
        &self,
        lead_id: &str,
        appointment_time: &str,
        calendar_event_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Stamps `last_follow_up_at` with the current time.
    async fn record_follow_up(&self, lead_id: &str) -> Result<(), StoreError>;

    async fn list_leads(&self, tenant_id: &str) -> Result<Vec<Lead>, StoreError>;
}

#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Creates a dataset in the `pending` state.
    async fn create_dataset(&self, dataset: NewDataset) -> Result<Dataset, StoreError>;

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>, StoreError>;

    /// Moves a dataset from `from` to `update.status`, rejecting illegal or
    /// stale transitions.
    async fn transition_dataset(
        &self,
        dataset_id: &str,
        from: DatasetStatus,
        update: DatasetUpdate,
    ) -> Result<Dataset, StoreError>;
}
