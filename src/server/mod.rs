//! Browser form and JSON API over the analysis pipeline.

mod routes;

pub use routes::ApiError;

use crate::adapters::{LocalStorage, OpenAiClient};
use crate::config::Settings;
use crate::core::audit::AuditLog;
use crate::core::retention::DocumentStore;
use crate::domain::model::AnalysisOutcome;
use crate::domain::ports::ChatModel;
use crate::utils::error::Result;
use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Builds a chat model for one request from a resolved API key.
pub type ModelFactory = Arc<dyn Fn(String) -> Result<Arc<dyn ChatModel>> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<DocumentStore>,
    pub audit: Arc<AuditLog<LocalStorage>>,
    pub history: Arc<RwLock<Vec<AnalysisOutcome>>>,
    pub model_factory: ModelFactory,
    pub secrets_path: PathBuf,
}

impl AppState {
    pub fn new(settings: Settings, audit: AuditLog<LocalStorage>, secrets_path: PathBuf) -> Self {
        let settings = Arc::new(settings);
        let factory_settings = settings.clone();
        let model_factory: ModelFactory = Arc::new(move |api_key: String| -> Result<Arc<dyn ChatModel>> {
            let client = OpenAiClient::new(factory_settings.as_ref(), api_key)?;
            Ok(Arc::new(client) as Arc<dyn ChatModel>)
        });

        Self {
            store: Arc::new(DocumentStore::new(settings.retention_policy())),
            settings,
            audit: Arc::new(audit),
            history: Arc::new(RwLock::new(Vec::new())),
            model_factory,
            secrets_path,
        }
    }

    pub fn with_model_factory(mut self, model_factory: ModelFactory) -> Self {
        self.model_factory = model_factory;
        self
    }

    /// Adds an outcome, dropping the oldest beyond `history_limit`.
    pub async fn remember(&self, outcome: AnalysisOutcome) {
        let mut history = self.history.write().await;
        history.push(outcome);
        let overflow = history.len().saturating_sub(self.settings.history_limit);
        history.drain(..overflow);
    }
}

/// Drops expired uploads (auditing each deletion) and stale history entries.
pub async fn purge_expired(state: &AppState) -> usize {
    let now = Utc::now();
    let purged = state.store.purge_expired(now).await;
    for document in &purged {
        state
            .audit
            .log_document_deletion(&document.file_hash, &document.filename)
            .await;
    }

    let policy = *state.store.policy();
    state
        .history
        .write()
        .await
        .retain(|outcome| !policy.should_delete_analysis(outcome.analyzed_at, now));

    if !purged.is_empty() {
        tracing::info!("Purged {} expired document(s)", purged.len());
    }
    purged.len()
}

pub fn spawn_purge_task(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.settings.purge_interval_secs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            purge_expired(&state).await;
        }
    })
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_file_size_bytes + 1024 * 1024;

    Router::new()
        .route("/", get(routes::index))
        .route("/api/health", get(routes::health))
        .route("/api/analyze", post(routes::analyze))
        .route("/api/inspect", post(routes::inspect))
        .route(
            "/api/history",
            get(routes::history).delete(routes::clear_history),
        )
        .route("/api/reports/:hash/export", get(routes::export_report))
        .route("/api/audit", get(routes::audit_events))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let purge_task = spawn_purge_task(state.clone());
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Document analyst listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Could not install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server error")?;

    purge_task.abort();
    tracing::info!("Server stopped");
    Ok(())
}
