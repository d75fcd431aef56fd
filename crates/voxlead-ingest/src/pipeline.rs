//! Drives one upload through parse, chunk, embed and index, recording every
//! stage on the dataset record.

use crate::chunk::{chunk_text, content_preview};
use crate::config::IngestConfig;
use crate::embed::Embedder;
use crate::error::IngestError;
use crate::index::{IndexEntry, VectorIndex};
use crate::parse::parse_document;
use std::sync::Arc;
use voxlead_store::{DatasetStore, DatasetUpdate, NewDataset};
use voxlead_types::{Dataset, DatasetStatus, SourceType};

#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub tenant_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub source_type: String,
    pub bytes: Vec<u8>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

#[derive(Clone)]
pub struct IngestPipeline {
    datasets: Arc<dyn DatasetStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestPipeline {
    pub fn new(
        datasets: Arc<dyn DatasetStore>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            datasets,
            embedder,
            index,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Ingests one document.
    ///
    /// Stage failures are recorded on the dataset, which is returned in the
    /// `failed` state. `Err` means the dataset record itself could not be
    /// created or updated.
    pub async fn ingest(&self, request: IngestRequest) -> Result<Dataset, IngestError> {
        let IngestRequest {
            tenant_id,
            uploaded_by,
            file_name,
            source_type,
            bytes,
            chunk_size,
            chunk_overlap,
        } = request;

        let dataset = self
            .datasets
            .create_dataset(NewDataset {
                tenant_id: tenant_id.clone(),
                uploaded_by,
                file_name,
                source_type: source_type.clone(),
            })
            .await?;
        tracing::info!(
            dataset_id = %dataset.id,
            tenant_id = %tenant_id,
            source_type = %source_type,
            bytes = bytes.len(),
            "ingestion started"
        );

        let mut run = StageRun {
            datasets: self.datasets.as_ref(),
            dataset_id: &dataset.id,
            stage: DatasetStatus::Pending,
        };
        let chunking = (
            chunk_size.unwrap_or(self.chunk_size),
            chunk_overlap.unwrap_or(self.chunk_overlap),
        );

        match self
            .run_stages(&mut run, &tenant_id, &source_type, bytes, chunking)
            .await
        {
            Ok(dataset) => {
                tracing::info!(
                    dataset_id = %dataset.id,
                    vector_count = dataset.vector_count,
                    "ingestion completed"
                );
                Ok(dataset)
            }
            Err(err) => {
                tracing::warn!(
                    dataset_id = %dataset.id,
                    stage = %run.stage,
                    error = %err,
                    "ingestion failed"
                );
                let failed = self
                    .datasets
                    .transition_dataset(
                        &dataset.id,
                        run.stage,
                        DatasetUpdate {
                            error_message: Some(err.to_string()),
                            ..DatasetUpdate::status(DatasetStatus::Failed)
                        },
                    )
                    .await?;
                Ok(failed)
            }
        }
    }

    async fn run_stages(
        &self,
        run: &mut StageRun<'_>,
        tenant_id: &str,
        source_type: &str,
        bytes: Vec<u8>,
        (chunk_size, chunk_overlap): (usize, usize),
    ) -> Result<Dataset, IngestError> {
        run.advance(DatasetUpdate::status(DatasetStatus::Parsing))
            .await?;
        let source: SourceType = source_type
            .trim()
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| IngestError::UnsupportedSource(source_type.to_string()))?;
        let text = tokio::task::spawn_blocking(move || parse_document(source, &bytes))
            .await
            .map_err(|e| IngestError::Join(e.to_string()))??;

        run.advance(DatasetUpdate {
            content_preview: Some(content_preview(&text)),
            ..DatasetUpdate::status(DatasetStatus::Chunking)
        })
        .await?;
        let chunks = chunk_text(&text, chunk_size, chunk_overlap)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        run.advance(DatasetUpdate::status(DatasetStatus::Embedding))
            .await?;
        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(IngestError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        run.advance(DatasetUpdate::status(DatasetStatus::Indexing))
            .await?;
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (content, embedding))| IndexEntry {
                chunk_index: i as u32,
                content,
                embedding,
            })
            .collect();
        let written = self.index.upsert(tenant_id, run.dataset_id, entries).await?;

        run.advance(DatasetUpdate {
            vector_count: Some(written),
            ..DatasetUpdate::status(DatasetStatus::Completed)
        })
        .await
    }
}

/// Tracks the stage the dataset is in so a failure can be recorded from it.
struct StageRun<'a> {
    datasets: &'a dyn DatasetStore,
    dataset_id: &'a str,
    stage: DatasetStatus,
}

impl StageRun<'_> {
    async fn advance(&mut self, update: DatasetUpdate) -> Result<Dataset, IngestError> {
        let dataset = self
            .datasets
            .transition_dataset(self.dataset_id, self.stage, update)
            .await?;
        tracing::debug!(dataset_id = %self.dataset_id, stage = %dataset.status, "stage entered");
        self.stage = dataset.status;
        Ok(dataset)
    }
}
