//! Lead persistence.

use crate::{enum_column, LeadWrite, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use voxlead_types::{Lead, LeadStatus, LeadUpsert, UNKNOWN_PROSPECT};

const LEAD_COLUMNS: &str = "id, tenant_id, full_name, phone_number, email, status, score,
    interest, last_call_id, preferred_appointment_time, calendar_event_id,
    last_follow_up_at, created_at, updated_at";

pub fn get_lead(conn: &Connection, lead_id: &str) -> Result<Option<Lead>, StoreError> {
    let lead = conn
        .query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            [lead_id],
            map_row_to_lead,
        )
        .optional()?;
    Ok(lead)
}

pub fn find_lead_by_phone(
    conn: &Connection,
    tenant_id: &str,
    phone_number: &str,
) -> Result<Option<Lead>, StoreError> {
    let lead = conn
        .query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE tenant_id = ?1 AND phone_number = ?2"),
            params![tenant_id, phone_number.trim()],
            map_row_to_lead,
        )
        .optional()?;
    Ok(lead)
}

/// Creates or updates the lead for `(tenant_id, phone_number)`.
///
/// A single `INSERT .. ON CONFLICT .. RETURNING` statement, so two calls from
/// the same number can never produce two rows. On update, `None` fields keep
/// their stored value and a `won` lead keeps its status.
pub fn upsert_lead(conn: &Connection, upsert: &LeadUpsert) -> Result<LeadWrite, StoreError> {
    let candidate_id = uuid::Uuid::new_v4().to_string();
    let lead_id: String = conn.query_row(
        "INSERT INTO leads (
            id, tenant_id, phone_number, full_name, email, status, score,
            interest, last_call_id, preferred_appointment_time
         ) VALUES (?1, ?2, ?3, COALESCE(?4, ?11), ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(tenant_id, phone_number) DO UPDATE SET
            full_name = COALESCE(?4, leads.full_name),
            email = COALESCE(excluded.email, leads.email),
            status = CASE WHEN leads.status = 'won' THEN leads.status ELSE excluded.status END,
            score = excluded.score,
            interest = COALESCE(excluded.interest, leads.interest),
            last_call_id = COALESCE(excluded.last_call_id, leads.last_call_id),
            preferred_appointment_time =
                COALESCE(excluded.preferred_appointment_time, leads.preferred_appointment_time),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         RETURNING id",
        params![
            candidate_id,
            upsert.tenant_id,
            upsert.phone_number.trim(),
            upsert.full_name,
            upsert.email,
            upsert.status.as_str(),
            upsert.score,
            upsert.interest,
            upsert.last_call_id,
            upsert.preferred_appointment_time,
            UNKNOWN_PROSPECT,
        ],
        |row| row.get(0),
    )?;

    let created = lead_id == candidate_id;
    tracing::info!(
        lead_id = %lead_id,
        tenant_id = %upsert.tenant_id,
        created,
        status = %upsert.status,
        score = upsert.score,
        "lead upserted"
    );
    Ok(LeadWrite { lead_id, created })
}

pub fn schedule_appointment(
    conn: &Connection,
    lead_id: &str,
    appointment_time: &str,
    calendar_event_id: Option<&str>,
) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE leads SET
            status = ?2,
            preferred_appointment_time = ?3,
            calendar_event_id = COALESCE(?4, calendar_event_id),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![
            lead_id,
            LeadStatus::AppointmentScheduled.as_str(),
            appointment_time,
            calendar_event_id,
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::not_found("lead", lead_id));
    }
    Ok(())
}

pub fn record_follow_up(conn: &Connection, lead_id: &str) -> Result<(), StoreError> {
    let updated = conn.execute(
        "UPDATE leads SET
            last_follow_up_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        [lead_id],
    )?;
    if updated == 0 {
        return Err(StoreError::not_found("lead", lead_id));
    }
    Ok(())
}

/// Lists a tenant's leads, highest score first.
pub fn list_leads(conn: &Connection, tenant_id: &str) -> Result<Vec<Lead>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEAD_COLUMNS} FROM leads WHERE tenant_id = ?1
         ORDER BY score DESC, updated_at DESC"
    ))?;
    let rows = stmt.query_map([tenant_id], map_row_to_lead)?;
    let mut leads = Vec::new();
    for row in rows {
        leads.push(row?);
    }
    Ok(leads)
}

fn map_row_to_lead(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        full_name: row.get(2)?,
        phone_number: row.get(3)?,
        email: row.get(4)?,
        status: enum_column(row, 5)?,
        score: row.get(6)?,
        interest: row.get(7)?,
        last_call_id: row.get(8)?,
        preferred_appointment_time: row.get(9)?,
        calendar_event_id: row.get(10)?,
        last_follow_up_at: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        voxlead_db::run_migrations(&conn).expect("migrations should succeed");
        conn
    }

    fn upsert(score: u8) -> LeadUpsert {
        LeadUpsert {
            tenant_id: "tenant-1".into(),
            phone_number: "+33611111111".into(),
            full_name: None,
            email: None,
            status: LeadStatus::ToContact,
            score,
            interest: Some("Two-bedroom flat".into()),
            last_call_id: Some("call-1".into()),
            preferred_appointment_time: None,
        }
    }

    #[test]
    fn second_upsert_updates_same_row() {
        let conn = setup();
        let first = upsert_lead(&conn, &upsert(40)).expect("insert");
        assert!(first.created);

        let mut second = upsert(75);
        second.full_name = Some("Marie Dupont".into());
        second.last_call_id = Some("call-2".into());
        let second = upsert_lead(&conn, &second).expect("update");
        assert!(!second.created);
        assert_eq!(second.lead_id, first.lead_id);

        let leads = list_leads(&conn, "tenant-1").expect("list");
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].score, 75);
        assert_eq!(leads[0].full_name, "Marie Dupont");
        assert_eq!(leads[0].last_call_id.as_deref(), Some("call-2"));
    }

    #[test]
    fn placeholder_name_and_preserved_fields() {
        let conn = setup();
        let mut first = upsert(40);
        first.email = Some("marie@example.com".into());
        upsert_lead(&conn, &first).expect("insert");
        upsert_lead(&conn, &upsert(50)).expect("update");

        let lead = find_lead_by_phone(&conn, "tenant-1", "+33611111111")
            .expect("query")
            .expect("lead");
        assert_eq!(lead.full_name, UNKNOWN_PROSPECT);
        assert_eq!(lead.email.as_deref(), Some("marie@example.com"));
    }

    #[test]
    fn same_phone_other_tenant_is_separate() {
        let conn = setup();
        upsert_lead(&conn, &upsert(40)).expect("insert");
        let mut other = upsert(40);
        other.tenant_id = "tenant-2".into();
        assert!(upsert_lead(&conn, &other).expect("insert").created);
    }

    #[test]
    fn appointment_and_follow_up_stamps() {
        let conn = setup();
        let write = upsert_lead(&conn, &upsert(60)).expect("insert");
        schedule_appointment(&conn, &write.lead_id, "2024-09-02T15:30:00Z", Some("evt-1"))
            .expect("schedule");
        record_follow_up(&conn, &write.lead_id).expect("follow-up");

        let lead = get_lead(&conn, &write.lead_id).expect("query").expect("lead");
        assert_eq!(lead.status, LeadStatus::AppointmentScheduled);
        assert_eq!(lead.preferred_appointment_time.as_deref(), Some("2024-09-02T15:30:00Z"));
        assert_eq!(lead.calendar_event_id.as_deref(), Some("evt-1"));
        assert!(lead.last_follow_up_at.is_some());

        let err = record_follow_up(&conn, "missing").expect_err("unknown lead");
        assert!(matches!(err, StoreError::NotFound { kind: "lead", .. }));
    }
}
