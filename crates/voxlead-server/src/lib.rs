//! voxlead HTTP surface.
//!
//! Telephony webhooks answer with TwiML and never surface errors to the
//! platform; the JSON endpoints trigger post-call workflows, ingestion and
//! directory administration.

pub mod api_admin;
pub mod api_appointments;
pub mod api_calls;
pub mod api_datasets;
pub mod api_leads;
pub mod api_webhooks;
pub mod config;
pub mod error;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Extension, Json, Router,
};
use config::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use voxlead_db::DbPool;
use voxlead_flows::FlowContext;
use voxlead_ingest::{
    Embedder, HashingEmbedder, IngestError, IngestPipeline, OpenAiEmbedder, SqliteVectorIndex,
};
use voxlead_notify::{Channels, NotifyError};
use voxlead_store::SqliteStore;
use voxlead_voice::{ConversationalInference, InferenceError, NullInference, OpenAiInference};

/// Maximum body size for everything except dataset uploads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read access for the JSON endpoints and directory writes.
    pub store: Arc<SqliteStore>,
    pub flows: FlowContext,
    pub ingest: IngestPipeline,
    pub max_upload_bytes: usize,
}

/// Errors building the state from configuration.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("inference client: {0}")]
    Inference(#[from] InferenceError),
    #[error("notification channels: {0}")]
    Notify(#[from] NotifyError),
    #[error("embedding client: {0}")]
    Embedding(#[from] IngestError),
}

impl AppState {
    /// Wires every port to the SQLite store and the configured providers.
    pub fn from_config(pool: DbPool, config: &Config) -> Result<Self, StateError> {
        let inference: Arc<dyn ConversationalInference> = if config.inference.is_enabled() {
            Arc::new(OpenAiInference::new(config.inference.clone())?)
        } else {
            tracing::warn!("no inference api key configured, every turn gets the fallback reply");
            Arc::new(NullInference)
        };

        let mut notify = config.notify.clone();
        notify.outbound_twiml_url = config.outbound_twiml_url();
        let channels = Channels::from_config(&notify)?;
        tracing::info!(?channels, "notification channels configured");

        let embedder: Arc<dyn Embedder> = if config.ingest.embedding.is_enabled() {
            Arc::new(OpenAiEmbedder::new(config.ingest.embedding.clone())?)
        } else {
            Arc::new(HashingEmbedder::default())
        };

        Ok(Self::new(
            pool,
            inference,
            channels,
            embedder,
            config,
        ))
    }

    /// Builds the state around explicit collaborators.
    pub fn new(
        pool: DbPool,
        inference: Arc<dyn ConversationalInference>,
        channels: Channels,
        embedder: Arc<dyn Embedder>,
        config: &Config,
    ) -> Self {
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let flows = FlowContext::new(
            store.clone(),
            inference,
            channels,
            config.telephony.clone(),
            config.follow_up.clone(),
        );
        let ingest = IngestPipeline::new(
            store.clone(),
            embedder,
            Arc::new(SqliteVectorIndex::new(pool)),
            &config.ingest,
        );
        Self {
            store,
            flows,
            ingest,
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    let upload_routes = Router::new()
        .route("/api/datasets", post(api_datasets::create_dataset_handler))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let router = Router::new()
        .route("/health", get(health))
        .route("/webhooks/voice", post(api_webhooks::voice_handler))
        .route("/webhooks/speech", post(api_webhooks::speech_handler))
        .route("/webhooks/call-status", post(api_webhooks::call_status_handler))
        .route("/api/calls/end", post(api_calls::end_call_handler))
        .route("/api/calls/{callId}", get(api_calls::get_call_handler))
        .route(
            "/api/datasets/{datasetId}",
            get(api_datasets::get_dataset_handler),
        )
        .route(
            "/api/appointments/confirm",
            post(api_appointments::confirm_appointment_handler),
        )
        .route(
            "/api/leads/{leadId}/follow-up",
            post(api_leads::follow_up_handler),
        )
        .route(
            "/api/tenants/{tenantId}/leads",
            get(api_leads::list_leads_handler),
        )
        .route("/api/agents/{agentId}", put(api_admin::put_agent_handler))
        .route("/api/numbers/{number}", put(api_admin::put_number_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .merge(upload_routes);

    router
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
