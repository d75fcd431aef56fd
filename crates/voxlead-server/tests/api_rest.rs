mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::test_app;
use serde_json::json;
use voxlead_voice::ScriptedInference;

#[tokio::test]
async fn csv_upload_completes() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/datasets",
            json!({
                "tenantId": "tenant-1",
                "userId": "user-1",
                "fileName": "listings.csv",
                "fileDataUri": "data:text/csv;base64,YSxiCjEsMgo=",
                "sourceType": "csv"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "completed");
    assert!(json["vectorCount"].as_u64().expect("count") >= 1);
    assert!(json["contentPreview"]
        .as_str()
        .expect("preview")
        .contains("a: 1"));

    let dataset_id = json["datasetId"].as_str().expect("id");
    let (status, dataset) = app.get(&format!("/api/datasets/{dataset_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dataset["fileName"], "listings.csv");
}

#[tokio::test]
async fn unsupported_source_type_fails_the_dataset() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/datasets",
            json!({
                "tenantId": "tenant-1",
                "userId": "user-1",
                "fileName": "brochure.docx",
                "fileDataUri": "YSxiCjEsMgo=",
                "sourceType": "docx"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["status"], "failed");
    assert!(json.get("vectorCount").is_none());
    assert!(json["errorMessage"].as_str().is_some());
}

#[tokio::test]
async fn undecodable_payload_is_rejected() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/datasets",
            json!({
                "tenantId": "tenant-1",
                "userId": "user-1",
                "fileName": "x.txt",
                "fileDataUri": "data:text/plain;base64,%%%",
                "sourceType": "text"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn end_of_unknown_call_is_not_found() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json("POST", "/api/calls/end", json!({ "callId": "missing" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["callUpdateStatus"], "not_found");

    let (status, _) = app.get("/api/calls/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn follow_up_for_unknown_lead_reports_failed() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/leads/nobody/follow-up",
            json!({ "tenantId": "tenant-1", "followUpStrategy": "sms_reminder" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "failed");
    assert_eq!(json["strategyApplied"], "sms_reminder");
}

#[tokio::test]
async fn appointment_requires_fields() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/appointments/confirm",
            json!({
                "tenantId": "tenant-1",
                "leadId": "",
                "appointmentDateTime": "2024-09-02T15:30:00+02:00",
                "agentUserId": "user-9"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "leadId is required");
}

#[tokio::test]
async fn appointment_for_unknown_lead_is_failure() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, json) = app
        .json(
            "POST",
            "/api/appointments/confirm",
            json!({
                "tenantId": "tenant-1",
                "leadId": "nobody",
                "appointmentDateTime": "2024-09-02T15:30:00+02:00",
                "agentUserId": "user-9"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["overallStatus"], "failure");
    assert_eq!(json["smsNotificationStatus"], "skipped");
}

#[tokio::test]
async fn number_mapping_needs_a_known_agent() {
    let app = test_app(Arc::new(ScriptedInference::new()));
    let (status, _) = app
        .json(
            "PUT",
            "/api/numbers/+33100000000",
            json!({ "tenantId": "tenant-1", "agentId": "ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.seed_directory().await;
    let (status, _) = app
        .json(
            "PUT",
            "/api/agents/agent-1",
            json!({
                "tenantId": "tenant-2",
                "systemPrompt": "",
                "voiceProvider": "polly",
                "voiceId": "Polly.Lea",
                "initialGreeting": "Bonjour"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
