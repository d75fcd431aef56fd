//! [`SqliteStore`]: every port backed by the shared SQLite pool.

use crate::{
    calls, datasets, directory, leads, CallFinalization, CallStore, DatasetStore, DatasetUpdate,
    Directory, LeadStore, LeadWrite, NewDataset, StoreError,
};
use async_trait::async_trait;
use rusqlite::Connection;
use voxlead_db::DbPool;
use voxlead_types::{
    AgentConfig, Call, Dataset, DatasetStatus, Lead, LeadUpsert, NewCall, NumberMapping, Utterance,
};

/// SQLite implementation of all store ports.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl CallStore for SqliteStore {
    async fn create_call(&self, call: NewCall) -> Result<Call, StoreError> {
        self.with_conn(move |conn| calls::create_call(conn, &call)).await
    }

    async fn get_call(&self, call_id: &str) -> Result<Option<Call>, StoreError> {
        let call_id = call_id.to_string();
        self.with_conn(move |conn| calls::get_call(conn, &call_id)).await
    }

    async fn find_call_by_external_sid(&self, sid: &str) -> Result<Option<Call>, StoreError> {
        let sid = sid.to_string();
        self.with_conn(move |conn| calls::find_call_by_external_sid(conn, &sid))
            .await
    }

    async fn append_turn(
        &self,
        call_id: &str,
        utterances: Vec<Utterance>,
        summary: Option<String>,
    ) -> Result<Vec<Utterance>, StoreError> {
        let call_id = call_id.to_string();
        self.with_conn(move |conn| {
            calls::append_turn(conn, &call_id, &utterances, summary.as_deref())
        })
        .await
    }

    async fn finalize_call(
        &self,
        call_id: &str,
        finalization: CallFinalization,
    ) -> Result<(), StoreError> {
        let call_id = call_id.to_string();
        self.with_conn(move |conn| calls::finalize_call(conn, &call_id, &finalization))
            .await
    }

    async fn attach_lead(&self, call_id: &str, lead_id: &str) -> Result<(), StoreError> {
        let call_id = call_id.to_string();
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| calls::attach_lead(conn, &call_id, &lead_id))
            .await
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn lookup_number(
        &self,
        phone_number: &str,
    ) -> Result<Option<NumberMapping>, StoreError> {
        let phone_number = phone_number.to_string();
        self.with_conn(move |conn| directory::lookup_number(conn, &phone_number))
            .await
    }

    async fn agent_config(&self, agent_id: &str) -> Result<Option<AgentConfig>, StoreError> {
        let agent_id = agent_id.to_string();
        self.with_conn(move |conn| directory::get_agent_config(conn, &agent_id))
            .await
    }

    async fn put_number(&self, mapping: NumberMapping) -> Result<(), StoreError> {
        self.with_conn(move |conn| directory::upsert_number_mapping(conn, &mapping))
            .await
    }

    async fn put_agent(&self, config: AgentConfig) -> Result<(), StoreError> {
        self.with_conn(move |conn| directory::upsert_agent_config(conn, &config))
            .await
    }
}

#[async_trait]
impl LeadStore for SqliteStore {
    async fn get_lead(&self, lead_id: &str) -> Result<Option<Lead>, StoreError> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| leads::get_lead(conn, &lead_id)).await
    }

    async fn find_lead_by_phone(
        &self,
        tenant_id: &str,
        phone_number: &str,
    ) -> Result<Option<Lead>, StoreError> {
        let tenant_id = tenant_id.to_string();
        let phone_number = phone_number.to_string();
        self.with_conn(move |conn| leads::find_lead_by_phone(conn, &tenant_id, &phone_number))
            .await
    }

    async fn upsert_lead(&self, upsert: LeadUpsert) -> Result<LeadWrite, StoreError> {
        self.with_conn(move |conn| leads::upsert_lead(conn, &upsert)).await
    }

    async fn schedule_appointment(
        &self,
        lead_id: &str,
        appointment_time: &str,
        calendar_event_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let lead_id = lead_id.to_string();
        let appointment_time = appointment_time.to_string();
        let calendar_event_id = calendar_event_id.map(str::to_string);
        self.with_conn(move |conn| {
            leads::schedule_appointment(
                conn,
                &lead_id,
                &appointment_time,
                calendar_event_id.as_deref(),
            )
        })
        .await
    }

    async fn record_follow_up(&self, lead_id: &str) -> Result<(), StoreError> {
        let lead_id = lead_id.to_string();
        self.with_conn(move |conn| leads::record_follow_up(conn, &lead_id))
            .await
    }

    async fn list_leads(&self, tenant_id: &str) -> Result<Vec<Lead>, StoreError> {
        let tenant_id = tenant_id.to_string();
        self.with_conn(move |conn| leads::list_leads(conn, &tenant_id)).await
    }
}

#[async_trait]
impl DatasetStore for SqliteStore {
    async fn create_dataset(&self, dataset: NewDataset) -> Result<Dataset, StoreError> {
        self.with_conn(move |conn| datasets::create_dataset(conn, &dataset))
            .await
    }

    async fn get_dataset(&self, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
        let dataset_id = dataset_id.to_string();
        self.with_conn(move |conn| datasets::get_dataset(conn, &dataset_id))
            .await
    }

    async fn transition_dataset(
        &self,
        dataset_id: &str,
        from: DatasetStatus,
        update: DatasetUpdate,
    ) -> Result<Dataset, StoreError> {
        let dataset_id = dataset_id.to_string();
        self.with_conn(move |conn| datasets::transition_dataset(conn, &dataset_id, from, &update))
            .await
    }
}
