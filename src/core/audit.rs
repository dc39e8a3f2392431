//! Audit trail of document uploads, analyses and deletions.
//!
//! Entries are kept as one JSON array in a file behind [`Storage`]. Filenames
//! are hashed before they are written so the trail carries no customer names.

use crate::core::intake::sha256_hex;
use crate::core::retention::RetentionPolicy;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

pub const EVENT_UPLOAD: &str = "document_upload";
pub const EVENT_ANALYSIS: &str = "document_analysis";
pub const EVENT_DELETION: &str = "document_deletion";

pub const REQUIRED_AUDIT_FIELDS: [&str; 4] = ["timestamp", "event_type", "file_hash", "user_id"];
const SENSITIVE_FIELDS: [&str; 4] = ["ssn", "account_number", "routing_number", "tax_id"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub event_type: String,
    pub file_hash: String,
    pub filename: String,
    pub user_id: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

pub struct AuditLog<S: Storage> {
    storage: S,
    path: String,
    write_lock: Mutex<()>,
}

impl<S: Storage> AuditLog<S> {
    /// Opens the log, creating an empty array file when none exists.
    pub async fn open(storage: S, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !storage.exists(&path).await {
            storage.write_file(&path, b"[]").await?;
        }
        Ok(Self {
            storage,
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    async fn read_entries(&self) -> Result<Vec<Value>> {
        let raw = self.storage.read_file(&self.path).await?;
        if raw.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Appends an event. Failures are logged and swallowed so that auditing
    /// never blocks an analysis.
    pub async fn log_event(
        &self,
        event_type: &str,
        file_hash: &str,
        filename: &str,
        user_id: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            event_type: event_type.to_string(),
            file_hash: file_hash.to_string(),
            filename: sanitize_filename(filename),
            user_id: user_id.unwrap_or("anonymous").to_string(),
            metadata: metadata.unwrap_or_default(),
        };

        if let Err(e) = self.append(&entry).await {
            tracing::warn!("Audit log error ({}): {}", self.path, e);
        }
    }

    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_entries().await?;
        entries.push(serde_json::to_value(entry)?);
        let data = serde_json::to_vec_pretty(&entries)?;
        self.storage.write_file(&self.path, &data).await
    }

    /// Last `limit` raw entries, oldest first. Unreadable logs yield nothing.
    pub async fn recent_events(&self, limit: usize) -> Vec<Value> {
        let _guard = self.write_lock.lock().await;
        match self.read_entries().await {
            Ok(entries) => {
                let skip = entries.len().saturating_sub(limit);
                entries.into_iter().skip(skip).collect()
            }
            Err(e) => {
                tracing::warn!("Could not read audit log {}: {}", self.path, e);
                Vec::new()
            }
        }
    }

    pub async fn all_events(&self) -> Vec<Value> {
        self.recent_events(usize::MAX).await
    }

    pub async fn log_document_upload(
        &self,
        file_hash: &str,
        filename: &str,
        user_id: Option<&str>,
        file_size: usize,
    ) {
        let metadata = json!({ "file_size": file_size });
        self.log_event(EVENT_UPLOAD, file_hash, filename, user_id, as_map(metadata))
            .await;
    }

    pub async fn log_document_analysis(
        &self,
        file_hash: &str,
        filename: &str,
        user_id: Option<&str>,
        result_length: usize,
    ) {
        let metadata = json!({ "result_length": result_length });
        self.log_event(EVENT_ANALYSIS, file_hash, filename, user_id, as_map(metadata))
            .await;
    }

    pub async fn log_document_deletion(&self, file_hash: &str, filename: &str) {
        self.log_event(EVENT_DELETION, file_hash, filename, None, None)
            .await;
    }
}

fn as_map(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Keeps the extension and replaces the stem with 8 hex chars of its SHA-256.
pub fn sanitize_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, extension)) => {
            format!("{}.{}", &sha256_hex(stem.as_bytes())[..8], extension)
        }
        None => sha256_hex(filename.as_bytes())[..8].to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn check_retention_compliance(
    entries: &[Value],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> ComplianceReport {
    let mut report = ComplianceReport::default();

    for entry in entries {
        let missing: Vec<&str> = REQUIRED_AUDIT_FIELDS
            .iter()
            .copied()
            .filter(|field| entry.get(field).is_none())
            .collect();
        if !missing.is_empty() {
            report
                .issues
                .push(format!("Missing fields in audit log: {:?}", missing));
        }
    }

    for entry in entries {
        let raw = entry.get("timestamp").and_then(Value::as_str);
        match raw.and_then(parse_timestamp) {
            Some(ts) => {
                if policy.should_delete_analysis(ts, now) {
                    report
                        .warnings
                        .push(format!("Old analysis record found: {}", raw.unwrap_or_default()));
                }
            }
            None => report.issues.push(format!(
                "Invalid timestamp in audit log: {}",
                entry.get("timestamp").cloned().unwrap_or(Value::Null)
            )),
        }
    }

    report.compliant = report.issues.is_empty();
    report
}

/// Sensitive identifiers must be masked with `*` or stored as a SHA-256 hex digest.
pub fn validate_pii_handling(document_data: &Map<String, Value>) -> bool {
    SENSITIVE_FIELDS.iter().all(|field| match document_data.get(*field) {
        Some(Value::String(value)) => value.contains('*') || value.len() == 64,
        _ => true,
    })
}

pub fn export_csv(entries: &[Value]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["timestamp", "event_type", "file_hash", "filename", "user_id", "metadata"])?;

    for entry in entries {
        let field = |name: &str| {
            entry
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let metadata = entry
            .get("metadata")
            .map(Value::to_string)
            .unwrap_or_else(|| "{}".to_string());
        writer.write_record([
            field("timestamp"),
            field("event_type"),
            field("file_hash"),
            field("filename"),
            field("user_id"),
            metadata,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| crate::utils::error::AnalystError::IoError(e.into_error()))
}
