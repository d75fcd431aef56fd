//! Dataset records and their guarded status machine.

use crate::{enum_column, DatasetUpdate, NewDataset, StoreError};
use rusqlite::{params, Connection, OptionalExtension, Row};
use voxlead_types::{Dataset, DatasetStatus};

const DATASET_COLUMNS: &str = "id, tenant_id, uploaded_by, file_name, source_type, status,
    vector_count, content_preview, error_message, created_at, updated_at";

pub fn create_dataset(conn: &Connection, dataset: &NewDataset) -> Result<Dataset, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO datasets (id, tenant_id, uploaded_by, file_name, source_type, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id,
            dataset.tenant_id,
            dataset.uploaded_by,
            dataset.file_name,
            dataset.source_type,
            DatasetStatus::Pending.as_str(),
        ],
    )?;
    get_dataset(conn, &id)?.ok_or_else(|| StoreError::not_found("dataset", id))
}

pub fn get_dataset(conn: &Connection, dataset_id: &str) -> Result<Option<Dataset>, StoreError> {
    let dataset = conn
        .query_row(
            &format!("SELECT {DATASET_COLUMNS} FROM datasets WHERE id = ?1"),
            [dataset_id],
            map_row_to_dataset,
        )
        .optional()?;
    Ok(dataset)
}

/// Applies `update` if the dataset is still in `from` and the move is legal.
///
/// The `WHERE status = ?` guard makes a stale caller fail instead of
/// rewinding a dataset another request already advanced.
pub fn transition_dataset(
    conn: &Connection,
    dataset_id: &str,
    from: DatasetStatus,
    update: &DatasetUpdate,
) -> Result<Dataset, StoreError> {
    if !from.can_advance_to(update.status) {
        return Err(StoreError::InvalidTransition {
            from,
            to: update.status,
        });
    }

    let updated = conn.execute(
        "UPDATE datasets SET
            status = ?3,
            vector_count = COALESCE(?4, vector_count),
            content_preview = COALESCE(?5, content_preview),
            error_message = COALESCE(?6, error_message),
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = ?2",
        params![
            dataset_id,
            from.as_str(),
            update.status.as_str(),
            update.vector_count,
            update.content_preview,
            update.error_message,
        ],
    )?;

    if updated == 0 {
        let current = get_dataset(conn, dataset_id)?
            .ok_or_else(|| StoreError::not_found("dataset", dataset_id))?;
        return Err(StoreError::InvalidTransition {
            from: current.status,
            to: update.status,
        });
    }

    tracing::debug!(dataset_id, from = %from, to = %update.status, "dataset transitioned");
    get_dataset(conn, dataset_id)?.ok_or_else(|| StoreError::not_found("dataset", dataset_id))
}

fn map_row_to_dataset(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    Ok(Dataset {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        uploaded_by: row.get(2)?,
        file_name: row.get(3)?,
        source_type: row.get(4)?,
        status: enum_column(row, 5)?,
        vector_count: row.get(6)?,
        content_preview: row.get(7)?,
        error_message: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
