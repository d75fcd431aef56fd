//! The [`VectorIndex`] port and its SQLite implementation over
//! `dataset_chunks`.

use crate::error::IngestError;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::Serialize;
use voxlead_db::DbPool;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub chunk_index: u32,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChunk {
    pub dataset_id: String,
    pub chunk_index: u32,
    pub content: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Stores the entries of one dataset, replacing earlier ones with the
    /// same chunk index. Returns how many were written.
    async fn upsert(
        &self,
        tenant_id: &str,
        dataset_id: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<u32, IngestError>;

    /// Nearest chunks of a tenant by cosine similarity.
    async fn query(
        &self,
        tenant_id: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IngestError>;
}

#[derive(Clone)]
pub struct SqliteVectorIndex {
    pool: DbPool,
}

impl SqliteVectorIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, IngestError>
    where
        F: FnOnce(&mut Connection) -> Result<T, IngestError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| IngestError::Join(e.to_string()))?
    }
}

pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

pub fn insert_entries(
    conn: &mut Connection,
    tenant_id: &str,
    dataset_id: &str,
    entries: &[IndexEntry],
) -> Result<u32, IngestError> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO dataset_chunks
                (dataset_id, tenant_id, chunk_index, content, embedding, dimension)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(dataset_id, chunk_index) DO UPDATE SET
                content = excluded.content,
                embedding = excluded.embedding,
                dimension = excluded.dimension",
        )?;
        for entry in entries {
            stmt.execute(params![
                dataset_id,
                tenant_id,
                entry.chunk_index,
                entry.content,
                encode_vector(&entry.embedding),
                entry.embedding.len() as i64,
            ])?;
        }
    }
    tx.commit()?;
    Ok(entries.len() as u32)
}

pub fn nearest_chunks(
    conn: &Connection,
    tenant_id: &str,
    vector: &[f32],
    top_k: usize,
) -> Result<Vec<ScoredChunk>, IngestError> {
    let mut stmt = conn.prepare(
        "SELECT dataset_id, chunk_index, content, embedding FROM dataset_chunks
         WHERE tenant_id = ?1 AND dimension = ?2",
    )?;
    let rows = stmt.query_map(params![tenant_id, vector.len() as i64], |row| {
        let embedding: Vec<u8> = row.get(3)?;
        Ok(ScoredChunk {
            dataset_id: row.get(0)?,
            chunk_index: row.get(1)?,
            content: row.get(2)?,
            score: cosine(vector, &decode_vector(&embedding)),
        })
    })?;

    let mut scored = rows.collect::<Result<Vec<_>, _>>()?;
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(top_k);
    Ok(scored)
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(
        &self,
        tenant_id: &str,
        dataset_id: &str,
        entries: Vec<IndexEntry>,
    ) -> Result<u32, IngestError> {
        let tenant_id = tenant_id.to_string();
        let dataset_id = dataset_id.to_string();
        self.with_conn(move |conn| insert_entries(conn, &tenant_id, &dataset_id, &entries))
            .await
    }

    async fn query(
        &self,
        tenant_id: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, IngestError> {
        let tenant_id = tenant_id.to_string();
        let vector = vector.to_vec();
        self.with_conn(move |conn| nearest_chunks(conn, &tenant_id, &vector, top_k))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        voxlead_db::run_migrations(&conn).expect("migrations should succeed");
        conn.execute(
            "INSERT INTO datasets (id, tenant_id, uploaded_by, file_name, source_type, status)
             VALUES ('ds-1', 'tenant-1', 'user-1', 'a.txt', 'text', 'indexing')",
            [],
        )
        .expect("dataset");
        conn
    }

    fn entry(chunk_index: u32, content: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_index,
            content: content.into(),
            embedding,
        }
    }

    #[test]
    fn vectors_survive_blob_encoding() {
        let vector = vec![0.25, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&vector)), vector);
    }

    #[test]
    fn query_ranks_by_similarity_within_tenant() {
        let mut conn = setup();
        let written = insert_entries(
            &mut conn,
            "tenant-1",
            "ds-1",
            &[
                entry(0, "garden", vec![1.0, 0.0]),
                entry(1, "parking", vec![0.0, 1.0]),
                entry(2, "mixed", vec![0.7, 0.7]),
            ],
        )
        .expect("insert");
        assert_eq!(written, 3);

        let hits = nearest_chunks(&conn, "tenant-1", &[1.0, 0.1], 2).expect("query");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "garden");
        assert_eq!(hits[1].content, "mixed");

        assert!(nearest_chunks(&conn, "tenant-2", &[1.0, 0.0], 5)
            .expect("query")
            .is_empty());
    }

    #[test]
    fn reinserting_replaces_chunk() {
        let mut conn = setup();
        insert_entries(&mut conn, "tenant-1", "ds-1", &[entry(0, "old", vec![1.0])])
            .expect("insert");
        insert_entries(&mut conn, "tenant-1", "ds-1", &[entry(0, "new", vec![1.0])])
            .expect("insert");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM dataset_chunks", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 1);
        let hits = nearest_chunks(&conn, "tenant-1", &[1.0], 1).expect("query");
        assert_eq!(hits[0].content, "new");
    }
}
