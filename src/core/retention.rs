use crate::domain::model::{Document, DocumentType};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const DEFAULT_FILE_RETENTION_HOURS: i64 = 24;
pub const DEFAULT_ANALYSIS_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub file_retention: Duration,
    pub analysis_retention: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_RETENTION_HOURS, DEFAULT_ANALYSIS_RETENTION_DAYS)
    }
}

impl RetentionPolicy {
    pub fn new(file_hours: i64, analysis_days: i64) -> Self {
        Self {
            file_retention: Duration::hours(file_hours),
            analysis_retention: Duration::days(analysis_days),
        }
    }

    pub fn should_delete_file(&self, uploaded_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - uploaded_at > self.file_retention
    }

    /// Whole elapsed days must exceed the window.
    pub fn should_delete_analysis(&self, analyzed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - analyzed_at).num_days() > self.analysis_retention.num_days()
    }
}

/// Byte buffer that is zeroed before its memory is released.
pub struct SecureBuffer(Vec<u8>);

impl SecureBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.0.fill(0);
        // keep the wipe observable to the optimizer
        std::hint::black_box(&self.0);
    }
}

impl std::fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureBuffer({} bytes)", self.0.len())
    }
}

#[derive(Debug)]
pub struct StoredDocument {
    pub file_hash: String,
    pub filename: String,
    pub document_type: DocumentType,
    pub uploaded_at: DateTime<Utc>,
    pub data: SecureBuffer,
}

/// Uploaded documents kept in memory until the retention window lapses.
pub struct DocumentStore {
    policy: RetentionPolicy,
    documents: RwLock<HashMap<String, StoredDocument>>,
}

impl DocumentStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            policy,
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Re-uploading the same bytes refreshes the upload time.
    pub async fn insert(&self, document: &Document) {
        let stored = StoredDocument {
            file_hash: document.sha256.clone(),
            filename: document.filename.clone(),
            document_type: document.document_type,
            uploaded_at: document.uploaded_at,
            data: SecureBuffer::new(document.data.clone()),
        };
        self.documents
            .write()
            .await
            .insert(document.sha256.clone(), stored);
    }

    pub async fn contains(&self, file_hash: &str) -> bool {
        self.documents.read().await.contains_key(file_hash)
    }

    pub async fn get(&self, file_hash: &str) -> Option<Vec<u8>> {
        self.documents
            .read()
            .await
            .get(file_hash)
            .map(|doc| doc.data.as_slice().to_vec())
    }

    pub async fn remove(&self, file_hash: &str) -> Option<StoredDocument> {
        self.documents.write().await.remove(file_hash)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Removes every document older than the file retention window.
    /// Returned documents are wiped when dropped.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Vec<StoredDocument> {
        let mut documents = self.documents.write().await;
        let expired: Vec<String> = documents
            .iter()
            .filter(|(_, doc)| self.policy.should_delete_file(doc.uploaded_at, now))
            .map(|(hash, _)| hash.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|hash| documents.remove(&hash))
            .collect()
    }
}
