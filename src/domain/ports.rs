use crate::domain::model::{
    AnalysisOutcome, AnalysisReport, AuthenticitySignals, ChatRequest, Document, Upload,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn model(&self) -> &str;
    fn vision_model(&self) -> &str;
    fn api_base(&self) -> &str;
    fn temperature(&self) -> f32;
    fn request_timeout_secs(&self) -> u64;
    fn max_file_size(&self) -> usize;
    fn retention_hours(&self) -> i64;
    fn analysis_retention_days(&self) -> i64;
}

/// A chat-completion backend. Returns the assistant message text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

#[async_trait]
impl<T: ChatModel + ?Sized> ChatModel for Arc<T> {
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        (**self).complete(request).await
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn intake(&self, upload: Upload) -> Result<Document>;
    async fn inspect(&self, document: &Document) -> Result<AuthenticitySignals>;
    async fn assess(
        &self,
        document: &Document,
        signals: &AuthenticitySignals,
    ) -> Result<AssessedDocument>;
    async fn record(
        &self,
        document: &Document,
        signals: AuthenticitySignals,
        assessed: AssessedDocument,
    ) -> Result<AnalysisOutcome>;
}

/// Intermediate findings plus the validated verdict.
#[derive(Debug, Clone)]
pub struct AssessedDocument {
    pub visual_findings: String,
    pub financial_findings: String,
    pub report: AnalysisReport,
}
