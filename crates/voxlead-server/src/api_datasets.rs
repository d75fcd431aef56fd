//! Knowledge-base uploads.

use crate::{
    error::{require, ApiError},
    AppState,
};
use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use voxlead_ingest::{decode_file_payload, IngestRequest};
use voxlead_store::DatasetStore;
use voxlead_types::{Dataset, DatasetStatus};

/// Request body for `POST /api/datasets`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub file_name: String,
    /// `data:<mime>;base64,<data>` or bare base64.
    pub file_data_uri: String,
    pub source_type: String,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub chunk_overlap: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetResponse {
    pub dataset_id: String,
    pub status: DatasetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<Dataset> for CreateDatasetResponse {
    fn from(dataset: Dataset) -> Self {
        let completed = dataset.status == DatasetStatus::Completed;
        Self {
            dataset_id: dataset.id,
            status: dataset.status,
            vector_count: completed.then_some(dataset.vector_count),
            content_preview: dataset.content_preview,
            error_message: dataset.error_message,
        }
    }
}

/// Handler for `POST /api/datasets`.
///
/// Runs the whole pipeline before answering: 201 when the dataset completed,
/// 422 when a stage failed (the failed dataset is still returned).
pub async fn create_dataset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateDatasetRequest>,
) -> Result<(StatusCode, Json<CreateDatasetResponse>), ApiError> {
    require("tenantId", &payload.tenant_id)?;
    require("userId", &payload.user_id)?;
    require("fileName", &payload.file_name)?;
    require("sourceType", &payload.source_type)?;
    let bytes = decode_file_payload(&payload.file_data_uri)?;

    let dataset = state
        .ingest
        .ingest(IngestRequest {
            tenant_id: payload.tenant_id,
            uploaded_by: payload.user_id,
            file_name: payload.file_name,
            source_type: payload.source_type,
            bytes,
            chunk_size: payload.chunk_size,
            chunk_overlap: payload.chunk_overlap,
        })
        .await?;

    let status = if dataset.status == DatasetStatus::Completed {
        StatusCode::CREATED
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(dataset.into())))
}

/// Handler for `GET /api/datasets/{datasetId}`.
pub async fn get_dataset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(dataset_id): Path<String>,
) -> Result<Json<Dataset>, ApiError> {
    state
        .store
        .get_dataset(&dataset_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("dataset not found: {dataset_id}")))
}
