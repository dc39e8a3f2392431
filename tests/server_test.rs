mod common;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use doc_analyst::core::audit::{AuditLog, EVENT_DELETION};
use doc_analyst::domain::model::{ChatRequest, Document, DocumentKind, DocumentType};
use doc_analyst::domain::ports::ChatModel;
use doc_analyst::server::{build_router, purge_expired, AppState, ModelFactory};
use doc_analyst::{AnalystError, LocalStorage, Result, Settings};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "doc-analyst-test-boundary";

#[derive(Default)]
struct FakeModel;

#[async_trait]
impl ChatModel for FakeModel {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        if request.json_response {
            Ok(common::REPORT_JSON.to_string())
        } else {
            Ok("No anomalies observed.".to_string())
        }
    }
}

#[derive(Default)]
struct RateLimitedModel;

#[async_trait]
impl ChatModel for RateLimitedModel {
    async fn complete(&self, _request: ChatRequest) -> Result<String> {
        Err(AnalystError::RateLimited {
            message: "Rate limit reached for gpt-4o".to_string(),
        })
    }
}

fn factory<M: ChatModel + Default + 'static>() -> ModelFactory {
    Arc::new(|_key: String| -> Result<Arc<dyn ChatModel>> {
        let model: Arc<dyn ChatModel> = Arc::new(M::default());
        Ok(model)
    })
}

async fn state_with(settings: Settings, temp_dir: &TempDir, model_factory: ModelFactory) -> AppState {
    let audit = AuditLog::open(LocalStorage::new(temp_dir.path()), "audit_log.json")
        .await
        .unwrap();
    AppState::new(settings, audit, temp_dir.path().join("secrets.toml"))
        .with_model_factory(model_factory)
}

async fn test_state(temp_dir: &TempDir) -> AppState {
    state_with(Settings::default(), temp_dir, factory::<FakeModel>()).await
}

fn multipart(filename: &str, data: &[u8], fields: &[(&str, &str)]) -> Body {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn upload_request(path: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(body)
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_index_serves_upload_form() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(test_state(&temp_dir).await);

    let (status, _, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Financial Document Analyst"));
    assert!(html.contains("/api/analyze"));
    assert!(html.contains("fetch('/api/history')"));
    assert!(html.contains("Total Analyzed"));
}

#[tokio::test]
async fn test_analyze_then_history_and_export() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(test_state(&temp_dir).await);

    let body = multipart(
        "statement.png",
        &common::png(200, 100),
        &[("document_type", "pay_stub"), ("api_key", "sk-form"), ("user_id", "ops-2")],
    );
    let (status, _, body) = send(&app, upload_request("/api/analyze", body)).await;
    assert_eq!(status, StatusCode::OK);
    let outcome: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(outcome["document_type"], "pay_stub");
    assert_eq!(outcome["report"]["authenticity_score"], 84);
    let hash = outcome["file_hash"].as_str().unwrap().to_string();

    let (status, _, body) = send(&app, get("/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    let history: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(history.len(), 1);

    let (status, headers, body) = send(&app, get(&format!("/api/reports/{hash}/export"))).await;
    assert_eq!(status, StatusCode::OK);
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"analysis_report_"));
    let exported: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(exported["success"], true);
    assert_eq!(exported["outcome"]["file_hash"], hash.as_str());

    let (status, _, body) = send(&app, get("/api/audit?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    let events: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], "document_analysis");
    assert_eq!(events[0]["user_id"], "ops-2");

    let clear = Request::builder()
        .method("DELETE")
        .uri("/api/history")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, clear).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, body) = send(&app, get(&format!("/api/reports/{hash}/export"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["suggestion"].is_string());
}

#[tokio::test]
async fn test_unsupported_file_is_bad_request() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(test_state(&temp_dir).await);

    let body = multipart("notes.txt", b"plain text", &[("api_key", "sk-form")]);
    let (status, _, body) = send(&app, upload_request("/api/analyze", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("File Validation Failed"));
    assert_eq!(error["suggestion"], "Upload a PDF, PNG or JPG document");
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    std::env::remove_var("OPENAI_API_KEY");
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(test_state(&temp_dir).await);

    let body = multipart("scan.png", &common::png(16, 16), &[]);
    let (status, _, body) = send(&app, upload_request("/api/analyze", body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "Please enter your OpenAI API key");
}

#[tokio::test]
async fn test_rate_limit_passes_through() {
    let temp_dir = TempDir::new().unwrap();
    let state = state_with(Settings::default(), &temp_dir, factory::<RateLimitedModel>()).await;
    let app = build_router(state);

    let body = multipart("scan.png", &common::png(16, 16), &[("api_key", "sk-form")]);
    let (status, _, _) = send(&app, upload_request("/api/analyze", body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_before_model() {
    let temp_dir = TempDir::new().unwrap();
    let settings = Settings {
        max_file_size_bytes: 1024,
        ..Settings::default()
    };
    let state = state_with(settings, &temp_dir, factory::<RateLimitedModel>()).await;
    let app = build_router(state);

    let mut data = common::png(8, 8);
    data.resize(4096, 0);
    let body = multipart("scan.png", &data, &[("api_key", "sk-form")]);
    let (status, _, body) = send(&app, upload_request("/api/analyze", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].as_str().unwrap().contains("exceeds maximum"));
}

#[tokio::test]
async fn test_upload_over_body_limit_reports_file_size() {
    let temp_dir = TempDir::new().unwrap();
    let state = state_with(Settings::default(), &temp_dir, factory::<RateLimitedModel>()).await;
    let app = build_router(state.clone());

    let mut data = common::pdf("Closing balance 9,120.55", "QuickBooks Online");
    data.resize(12 * 1024 * 1024, b' ');
    let body = multipart("big.pdf", &data, &[("api_key", "sk-form")]);
    let (status, _, body) = send(&app, upload_request("/api/analyze", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["error"],
        "File Validation Failed: File size exceeds maximum allowed size of 10MB"
    );
    assert_eq!(error["suggestion"], "Upload a file no larger than 10MB");
    assert!(state.store.is_empty().await);
}

#[tokio::test]
async fn test_inspect_reports_local_signals_only() {
    let temp_dir = TempDir::new().unwrap();
    let state = state_with(Settings::default(), &temp_dir, factory::<RateLimitedModel>()).await;
    let app = build_router(state.clone());

    let pdf = common::pdf("Net pay 2,310.00", "QuickBooks Online");
    let body = multipart("stub.pdf", &pdf, &[("document_type", "Pay Stub")]);
    let (status, _, body) = send(&app, upload_request("/api/inspect", body)).await;
    assert_eq!(status, StatusCode::OK);

    let info: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(info["document_type"], "pay_stub");
    assert!(info["summary"].as_str().unwrap().contains("File: stub.pdf"));
    assert_eq!(info["signals"]["metadata"]["kind"], "pdf");
    assert!(state.store.is_empty().await);
    assert!(state.audit.all_events().await.is_empty());
}

#[tokio::test]
async fn test_health() {
    let temp_dir = TempDir::new().unwrap();
    let app = build_router(test_state(&temp_dir).await);

    let (status, _, body) = send(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["documents_held"], 0);
}

#[tokio::test]
async fn test_purge_removes_expired_uploads_and_audits_deletion() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(&temp_dir).await;

    let stale = Document {
        filename: "old_statement.pdf".to_string(),
        kind: DocumentKind::Pdf,
        document_type: DocumentType::BankStatement,
        sha256: "a".repeat(64),
        size: 5,
        uploaded_at: Utc::now() - Duration::hours(25),
        user_id: None,
        data: b"%PDF-".to_vec(),
    };
    let fresh = Document {
        sha256: "b".repeat(64),
        uploaded_at: Utc::now(),
        ..stale.clone()
    };
    state.store.insert(&stale).await;
    state.store.insert(&fresh).await;

    assert_eq!(purge_expired(&state).await, 1);
    assert!(!state.store.contains(&stale.sha256).await);
    assert!(state.store.contains(&fresh.sha256).await);

    let events = state.audit.all_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["event_type"], EVENT_DELETION);
    assert_eq!(events[0]["file_hash"], stale.sha256.as_str());
}
