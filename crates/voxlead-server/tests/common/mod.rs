#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use voxlead_db::{create_pool, run_migrations, DbRuntimeSettings};
use voxlead_ingest::HashingEmbedder;
use voxlead_notify::Channels;
use voxlead_server::{app, config::Config, AppState};
use voxlead_voice::ConversationalInference;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _db: tempfile::NamedTempFile,
}

pub fn test_app(inference: Arc<dyn ConversationalInference>) -> TestApp {
    let db = tempfile::NamedTempFile::new().expect("temp file");
    let path = db.path().to_str().expect("utf-8 path");
    let pool = create_pool(path, DbRuntimeSettings::default()).expect("pool");
    run_migrations(&pool.get().expect("connection")).expect("migrations");

    let mut config = Config::default();
    config.telephony.public_url = "https://voice.example.com".into();
    let state = AppState::new(
        pool,
        inference,
        Channels::default(),
        Arc::new(HashingEmbedder::default()),
        &config,
    );
    TestApp {
        router: app(state.clone()),
        state,
        _db: db,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, body.to_vec())
    }

    pub async fn json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let (status, bytes) = self.send(request).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request");
        let (status, bytes) = self.send(request).await;
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    /// Posts a telephony form and returns the raw body.
    pub async fn form(&self, uri: &str, fields: &[(&str, &str)]) -> (StatusCode, String) {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{k}={}", v.replace('+', "%2B").replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&");
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("request");
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8(bytes).expect("utf-8 body"))
    }

    /// Registers `agent-1` for `tenant-1` on `+33100000000`.
    pub async fn seed_directory(&self) {
        let (status, _) = self
            .json(
                "PUT",
                "/api/agents/agent-1",
                serde_json::json!({
                    "tenantId": "tenant-1",
                    "systemPrompt": "You are a real-estate assistant.",
                    "voiceProvider": "polly",
                    "voiceId": "Polly.Celine",
                    "initialGreeting": "Hello, how can I help?",
                    "language": "fr-FR"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .json(
                "PUT",
                "/api/numbers/+33100000000",
                serde_json::json!({ "tenantId": "tenant-1", "agentId": "agent-1" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}
