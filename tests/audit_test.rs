use chrono::Utc;
use doc_analyst::core::audit::{
    check_retention_compliance, export_csv, sanitize_filename, AuditLog, EVENT_UPLOAD,
};
use doc_analyst::core::retention::RetentionPolicy;
use doc_analyst::LocalStorage;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_open_creates_empty_log() {
    let temp_dir = TempDir::new().unwrap();
    let log = AuditLog::open(LocalStorage::new(temp_dir.path()), "logs/audit_log.json")
        .await
        .unwrap();

    let raw = std::fs::read_to_string(temp_dir.path().join("logs/audit_log.json")).unwrap();
    assert_eq!(raw, "[]");
    assert!(log.recent_events(10).await.is_empty());
}

#[tokio::test]
async fn test_concurrent_writers_keep_every_entry() {
    let temp_dir = TempDir::new().unwrap();
    let log = Arc::new(
        AuditLog::open(LocalStorage::new(temp_dir.path()), "audit_log.json")
            .await
            .unwrap(),
    );

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let log = log.clone();
            tokio::spawn(async move {
                log.log_document_upload(&format!("{:064x}", i), "statement.pdf", None, 1024 + i)
                    .await;
            })
        })
        .collect();
    for task in tasks {
        assert_ok!(task.await);
    }

    let events = log.all_events().await;
    assert_eq!(events.len(), 20);
    assert!(events.iter().all(|e| e["event_type"] == EVENT_UPLOAD));
    assert!(events.iter().all(|e| e["user_id"] == "anonymous"));
    assert!(events
        .iter()
        .all(|e| e["filename"] == sanitize_filename("statement.pdf").as_str()));

    let recent = log.recent_events(5).await;
    assert_eq!(recent.len(), 5);
}

#[tokio::test]
async fn test_corrupt_log_does_not_fail_callers() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("audit_log.json"), "{not json").unwrap();
    let log = AuditLog::open(LocalStorage::new(temp_dir.path()), "audit_log.json")
        .await
        .unwrap();

    let mut metadata = Map::new();
    metadata.insert("reason".to_string(), Value::from("manual"));
    log.log_event("document_deletion", "abc", "x.pdf", Some("ops"), Some(metadata))
        .await;

    assert!(log.recent_events(10).await.is_empty());
    let raw = std::fs::read_to_string(temp_dir.path().join("audit_log.json")).unwrap();
    assert_eq!(raw, "{not json");
}

#[tokio::test]
async fn test_written_log_is_compliant_and_exports_csv() {
    let temp_dir = TempDir::new().unwrap();
    let log = AuditLog::open(LocalStorage::new(temp_dir.path()), "audit_log.json")
        .await
        .unwrap();
    log.log_document_upload("abc", "a.png", Some("u1"), 10).await;
    log.log_document_analysis("abc", "a.png", Some("u1"), 512).await;
    log.log_document_deletion("abc", "a.png").await;

    let events = log.all_events().await;
    let report = check_retention_compliance(&events, &RetentionPolicy::default(), Utc::now());
    assert!(report.compliant, "issues: {:?}", report.issues);
    assert!(report.warnings.is_empty());
    assert_eq!(events[1]["metadata"]["result_length"], 512);

    let csv = String::from_utf8(assert_ok!(export_csv(&events))).unwrap();
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn test_compliance_rejects_incomplete_entries() {
    let entries = vec![json!({ "event_type": "document_upload" })];
    let report = check_retention_compliance(&entries, &RetentionPolicy::default(), Utc::now());
    assert!(!report.compliant);
    assert_eq!(report.issues.len(), 2);
    assert_err!(serde_json::from_str::<Vec<Value>>("{not json"));
}
