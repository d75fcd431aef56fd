//! Call records and transcripts.
//!
//! A transcript is stored one row per utterance in `call_utterances`. The
//! sequence number of each row is computed inside its own `INSERT`, and all
//! rows of one turn are written inside a single `IMMEDIATE` transaction, so two
//! requests appending to the same call serialize on the SQLite write lock
//! instead of overwriting each other.

use crate::{enum_column, CallFinalization, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use voxlead_types::{Call, CallAnalysis, NewCall, Utterance};

const CALL_COLUMNS: &str = "id, external_sid, tenant_id, agent_id, lead_id, direction,
    from_number, to_number, status, summary, intent, lead_score, duration_seconds,
    recording_url, analysis_json, created_at, finalized_at";

/// Inserts a new call and returns it with its generated id.
pub fn create_call(conn: &Connection, call: &NewCall) -> Result<Call, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO calls (
            id, external_sid, tenant_id, agent_id, lead_id, direction,
            from_number, to_number, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            call.external_sid,
            call.tenant_id,
            call.agent_id,
            call.lead_id,
            call.direction.as_str(),
            call.from_number,
            call.to_number,
            call.status.as_str(),
        ],
    )?;

    get_call(conn, &id)?.ok_or_else(|| StoreError::not_found("call", id))
}

pub fn get_call(conn: &Connection, call_id: &str) -> Result<Option<Call>, StoreError> {
    let call = conn
        .query_row(
            &format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"),
            [call_id],
            map_row_to_call,
        )
        .optional()?;
    with_transcript(conn, call)
}

pub fn find_call_by_external_sid(conn: &Connection, sid: &str) -> Result<Option<Call>, StoreError> {
    let call = conn
        .query_row(
            &format!("SELECT {CALL_COLUMNS} FROM calls WHERE external_sid = ?1"),
            [sid],
            map_row_to_call,
        )
        .optional()?;
    with_transcript(conn, call)
}

fn with_transcript(conn: &Connection, call: Option<Call>) -> Result<Option<Call>, StoreError> {
    match call {
        Some(mut call) => {
            call.transcript = load_transcript(conn, &call.id)?;
            Ok(Some(call))
        }
        None => Ok(None),
    }
}

/// Loads a transcript in sequence order.
pub fn load_transcript(conn: &Connection, call_id: &str) -> Result<Vec<Utterance>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT speaker, text FROM call_utterances WHERE call_id = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map([call_id], |row| {
        Ok(Utterance {
            speaker: enum_column(row, 0)?,
            text: row.get(1)?,
        })
    })?;

    let mut transcript = Vec::new();
    for row in rows {
        transcript.push(row?);
    }
    Ok(transcript)
}

/// Fails unless the call exists and has not been finalized.
fn ensure_open(conn: &Connection, call_id: &str) -> Result<(), StoreError> {
    let finalized_at: Option<Option<String>> = conn
        .query_row(
            "SELECT finalized_at FROM calls WHERE id = ?1",
            [call_id],
            |row| row.get(0),
        )
        .optional()?;

    match finalized_at {
        None => Err(StoreError::not_found("call", call_id)),
        Some(Some(_)) => Err(StoreError::CallFinalized(call_id.to_string())),
        Some(None) => Ok(()),
    }
}

fn insert_utterances(
    conn: &Connection,
    call_id: &str,
    utterances: &[Utterance],
) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "INSERT INTO call_utterances (call_id, seq, speaker, text)
         SELECT ?1, COALESCE(MAX(seq), 0) + 1, ?2, ?3
         FROM call_utterances WHERE call_id = ?1",
    )?;
    for utterance in utterances {
        stmt.execute(params![call_id, utterance.speaker.as_str(), utterance.text])?;
    }
    Ok(())
}

/// Appends a turn and optionally replaces the summary, in one transaction.
///
/// Returns the transcript as committed.
pub fn append_turn(
    conn: &mut Connection,
    call_id: &str,
    utterances: &[Utterance],
    summary: Option<&str>,
) -> Result<Vec<Utterance>, StoreError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_open(&tx, call_id)?;
    insert_utterances(&tx, call_id, utterances)?;
    if let Some(summary) = summary {
        tx.execute(
            "UPDATE calls SET summary = ?2 WHERE id = ?1",
            params![call_id, summary],
        )?;
    }
    let transcript = load_transcript(&tx, call_id)?;
    tx.commit()?;

    tracing::debug!(
        call_id,
        appended = utterances.len(),
        transcript_len = transcript.len(),
        "transcript turn appended"
    );
    Ok(transcript)
}

/// Appends the transcript tail and writes the final call fields.
pub fn finalize_call(
    conn: &mut Connection,
    call_id: &str,
    finalization: &CallFinalization,
) -> Result<(), StoreError> {
    let analysis_json = finalization
        .analysis
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_open(&tx, call_id)?;
    insert_utterances(&tx, call_id, &finalization.transcript_tail)?;
    tx.execute(
        "UPDATE calls SET
            status = ?2,
            summary = ?3,
            intent = ?4,
            lead_score = ?5,
            analysis_json = ?6,
            duration_seconds = ?7,
            recording_url = COALESCE(?8, recording_url),
            finalized_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![
            call_id,
            finalization.status.as_str(),
            finalization.summary,
            finalization.intent,
            finalization.lead_score,
            analysis_json,
            finalization.duration_seconds,
            finalization.recording_url,
        ],
    )?;
    tx.commit()?;
    Ok(())
}

/// Links a call to a lead. Allowed after finalization.
pub fn attach_lead(conn: &Connection, call_id: &str, lead_id: &str) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE calls SET lead_id = ?2 WHERE id = ?1",
        params![call_id, lead_id],
    )?;
    if updated == 0 {
        return Err(StoreError::not_found("call", call_id));
    }
    Ok(())
}

fn map_row_to_call(row: &Row<'_>) -> rusqlite::Result<Call> {
    let analysis_json: Option<String> = row.get(14)?;
    let analysis = analysis_json
        .map(|json| serde_json::from_str::<CallAnalysis>(&json))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(14, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Call {
        id: row.get(0)?,
        external_sid: row.get(1)?,
        tenant_id: row.get(2)?,
        agent_id: row.get(3)?,
        lead_id: row.get(4)?,
        direction: enum_column(row, 5)?,
        from_number: row.get(6)?,
        to_number: row.get(7)?,
        status: enum_column(row, 8)?,
        transcript: Vec::new(),
        summary: row.get(9)?,
        intent: row.get(10)?,
        lead_score: row.get(11)?,
        duration_seconds: row.get(12)?,
        recording_url: row.get(13)?,
        analysis,
        created_at: row.get(15)?,
        finalized_at: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxlead_types::{CallDirection, CallStatus, Speaker};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        voxlead_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    fn new_call() -> NewCall {
        NewCall {
            external_sid: Some("CA123".into()),
            tenant_id: "tenant-1".into(),
            agent_id: "agent-1".into(),
            lead_id: None,
            direction: CallDirection::Inbound,
            from_number: "+33611111111".into(),
            to_number: "+33100000000".into(),
            status: CallStatus::InProgress,
        }
    }

    #[test]
    fn create_and_fetch_call() {
        let conn = setup();
        let call = create_call(&conn, &new_call()).expect("create");
        assert_eq!(call.status, CallStatus::InProgress);
        assert!(call.transcript.is_empty());
        assert_eq!(call.summary, "");
        assert!(call.finalized_at.is_none());

        let by_sid = find_call_by_external_sid(&conn, "CA123")
            .expect("query")
            .expect("call by sid");
        assert_eq!(by_sid.id, call.id);
    }

    #[test]
    fn turns_append_in_order() {
        let mut conn = setup();
        let call = create_call(&conn, &new_call()).expect("create");

        append_turn(
            &mut conn,
            &call.id,
            &[Utterance::caller("hello"), Utterance::assistant("hi there")],
            None,
        )
        .expect("first turn");
        let transcript = append_turn(
            &mut conn,
            &call.id,
            &[Utterance::caller("a flat"), Utterance::assistant("which area?")],
            Some("Caller wants a flat"),
        )
        .expect("second turn");

        let speakers: Vec<Speaker> = transcript.iter().map(|u| u.speaker).collect();
        assert_eq!(
            speakers,
            vec![Speaker::Caller, Speaker::Assistant, Speaker::Caller, Speaker::Assistant]
        );
        assert_eq!(transcript[0].text, "hello");
        assert_eq!(transcript[3].text, "which area?");

        let stored = get_call(&conn, &call.id).expect("query").expect("call");
        assert_eq!(stored.transcript, transcript);
        assert_eq!(stored.summary, "Caller wants a flat");
    }

    #[test]
    fn summary_untouched_without_replacement() {
        let mut conn = setup();
        let call = create_call(&conn, &new_call()).expect("create");
        append_turn(&mut conn, &call.id, &[], Some("first")).expect("turn");
        append_turn(&mut conn, &call.id, &[Utterance::caller("x")], None).expect("turn");

        let stored = get_call(&conn, &call.id).expect("query").expect("call");
        assert_eq!(stored.summary, "first");
    }

    #[test]
    fn append_to_missing_call_is_not_found() {
        let mut conn = setup();
        let err = append_turn(&mut conn, "nope", &[Utterance::caller("x")], None)
            .expect_err("should fail");
        assert!(matches!(err, StoreError::NotFound { kind: "call", .. }));
    }

    #[test]
    fn finalized_call_rejects_appends() {
        let mut conn = setup();
        let call = create_call(&conn, &new_call()).expect("create");
        append_turn(&mut conn, &call.id, &[Utterance::caller("hello")], None).expect("turn");

        let finalization = CallFinalization {
            status: CallStatus::Completed,
            transcript_tail: vec![Utterance::assistant("goodbye")],
            summary: "Short call".into(),
            intent: Some("information_request".into()),
            lead_score: 12,
            analysis: Some(CallAnalysis::failed()),
            duration_seconds: 42,
            recording_url: Some("https://rec.example/1".into()),
        };
        finalize_call(&mut conn, &call.id, &finalization).expect("finalize");

        let stored = get_call(&conn, &call.id).expect("query").expect("call");
        assert_eq!(stored.status, CallStatus::Completed);
        assert_eq!(stored.transcript.len(), 2);
        assert_eq!(stored.duration_seconds, 42);
        assert_eq!(stored.lead_score, Some(12));
        assert!(stored.finalized_at.is_some());
        assert_eq!(stored.analysis, Some(CallAnalysis::failed()));

        let err = append_turn(&mut conn, &call.id, &[Utterance::caller("late")], None)
            .expect_err("appends after finalization fail");
        assert!(matches!(err, StoreError::CallFinalized(_)));

        let err = finalize_call(&mut conn, &call.id, &finalization).expect_err("double finalize");
        assert!(matches!(err, StoreError::CallFinalized(_)));
    }
}
