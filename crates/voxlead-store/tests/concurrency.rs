use std::sync::Arc;

use voxlead_db::{create_pool, run_migrations, DbRuntimeSettings};
use voxlead_store::{CallStore, LeadStore, SqliteStore};
use voxlead_types::{CallDirection, CallStatus, LeadStatus, LeadUpsert, NewCall, Speaker, Utterance};

fn store(file: &tempfile::NamedTempFile) -> SqliteStore {
    let path = file.path().to_str().expect("utf-8 path");
    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    run_migrations(&pool.get().expect("connection")).expect("migrations");
    SqliteStore::new(pool)
}

fn new_call() -> NewCall {
    NewCall {
        external_sid: None,
        tenant_id: "tenant-1".into(),
        agent_id: "agent-1".into(),
        lead_id: None,
        direction: CallDirection::Inbound,
        from_number: "+33611111111".into(),
        to_number: "+33100000000".into(),
        status: CallStatus::InProgress,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_never_lose_utterances() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let store = Arc::new(store(&file));
    let call = store.create_call(new_call()).await.expect("create call");

    let mut handles = Vec::new();
    for turn in 0..8 {
        let store = Arc::clone(&store);
        let call_id = call.id.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_turn(
                    &call_id,
                    vec![
                        Utterance::caller(format!("question {turn}")),
                        Utterance::assistant(format!("answer {turn}")),
                    ],
                    None,
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("join").expect("append");
    }

    let stored = store
        .get_call(&call.id)
        .await
        .expect("query")
        .expect("call");
    assert_eq!(stored.transcript.len(), 16);

    // Each turn's pair stays adjacent: turns serialize, they never interleave.
    for pair in stored.transcript.chunks(2) {
        assert_eq!(pair[0].speaker, Speaker::Caller);
        assert_eq!(pair[1].speaker, Speaker::Assistant);
        let n = pair[0].text.trim_start_matches("question ");
        assert_eq!(pair[1].text, format!("answer {n}"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_produce_one_lead() {
    let file = tempfile::NamedTempFile::new().expect("temp file");
    let store = Arc::new(store(&file));

    let mut handles = Vec::new();
    for score in [30u8, 50, 70, 90] {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .upsert_lead(LeadUpsert {
                    tenant_id: "tenant-1".into(),
                    phone_number: "+33611111111".into(),
                    full_name: None,
                    email: None,
                    status: LeadStatus::ToContact,
                    score,
                    interest: None,
                    last_call_id: None,
                    preferred_appointment_time: None,
                })
                .await
        }));
    }

    let mut created = 0;
    let mut ids = Vec::new();
    for handle in handles {
        let write = handle.await.expect("join").expect("upsert");
        if write.created {
            created += 1;
        }
        ids.push(write.lead_id);
    }
    ids.dedup();

    assert_eq!(created, 1);
    assert_eq!(ids.len(), 1);
    assert_eq!(store.list_leads("tenant-1").await.expect("list").len(), 1);
}
