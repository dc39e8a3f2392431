use super::{purge_expired, AppState};
use crate::config::secrets::resolve_api_key;
use crate::core::engine::AnalysisEngine;
use crate::core::export::{export_filename, ExportReport};
use crate::core::intake::validate_upload;
use crate::core::pipeline::DocumentPipeline;
use crate::core::signals::analyze_authenticity_signals;
use crate::core::summary::file_info_summary;
use crate::domain::model::{AnalysisOutcome, AuthenticitySignals, DocumentType, Upload};
use crate::utils::error::{AnalystError, ErrorCategory};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const INDEX_HTML: &str = include_str!("index.html");
const DEFAULT_AUDIT_LIMIT: usize = 100;

/// Error body `{error, suggestion}` with a status derived from the error category.
#[derive(Debug)]
pub struct ApiError(pub AnalystError);

impl From<AnalystError> for ApiError {
    fn from(err: AnalystError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.category() {
            ErrorCategory::Input => StatusCode::BAD_REQUEST,
            ErrorCategory::Credential => StatusCode::UNAUTHORIZED,
            ErrorCategory::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Configuration | ErrorCategory::System => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                "Request failed: {} (Category: {:?}, Severity: {:?})",
                self.0,
                self.0.category(),
                self.0.severity()
            );
        } else {
            tracing::warn!("Request rejected: {}", self.0);
        }

        let body = json!({
            "error": self.0.user_friendly_message(),
            "suggestion": self.0.recovery_suggestion(),
        });
        (status, Json(body)).into_response()
    }
}

/// A body cut off by `DefaultBodyLimit` is reported as an oversized file.
fn multipart_error(max_file_size: usize) -> impl Fn(MultipartError) -> AnalystError {
    move |err| {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AnalystError::FileTooLarge {
                size: None,
                max: max_file_size,
            }
        } else {
            AnalystError::ValidationError {
                message: format!("Could not read upload: {}", err.body_text()),
            }
        }
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    filename: Option<String>,
    data: Option<Vec<u8>>,
    document_type: Option<String>,
    api_key: Option<String>,
    user_id: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, AnalystError> {
        let multipart_error = multipart_error(max_file_size);
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(&multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    form.filename = field.file_name().map(str::to_string);
                    form.data = Some(field.bytes().await.map_err(&multipart_error)?.to_vec());
                }
                "document_type" => {
                    form.document_type = Some(field.text().await.map_err(&multipart_error)?)
                }
                "api_key" => form.api_key = Some(field.text().await.map_err(&multipart_error)?),
                "user_id" => form.user_id = Some(field.text().await.map_err(&multipart_error)?),
                other => tracing::debug!("Ignoring form field '{}'", other),
            }
        }
        Ok(form)
    }

    fn into_upload(self) -> Result<(Upload, Option<String>), AnalystError> {
        let data = self.data.ok_or_else(|| AnalystError::ValidationError {
            message: "Please upload a document".to_string(),
        })?;
        let document_type = match self.document_type.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => DocumentType::default(),
        };
        let user_id = self
            .user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let upload = Upload {
            filename: self.filename.unwrap_or_default(),
            data,
            document_type,
            user_id,
        };
        Ok((upload, self.api_key))
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "documents_held": state.store.len().await,
        "analyses": state.history.read().await.len(),
    }))
}

pub async fn analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    purge_expired(&state).await;

    let (upload, api_key) = UploadForm::read(multipart, state.settings.max_file_size_bytes)
        .await?
        .into_upload()?;
    let api_key = resolve_api_key(api_key.as_deref(), &state.secrets_path)?;
    let model = (state.model_factory)(api_key)?;

    let pipeline = DocumentPipeline::new(
        model,
        state.store.clone(),
        state.audit.clone(),
        state.settings.max_file_size_bytes,
    );
    let outcome = AnalysisEngine::new(pipeline).run(upload).await?;

    state.remember(outcome.clone()).await;
    Ok(Json(outcome))
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub filename: String,
    pub file_hash: String,
    pub file_size: usize,
    pub document_type: DocumentType,
    pub summary: String,
    pub signals: AuthenticitySignals,
}

/// Local checks only; nothing is stored and no model is called.
pub async fn inspect(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InspectResponse>, ApiError> {
    let max = state.settings.max_file_size_bytes;
    let (upload, _) = UploadForm::read(multipart, max).await?.into_upload()?;
    let document = validate_upload(upload, max)?;
    let summary = file_info_summary(&document.data, &document.filename, max);

    Ok(Json(InspectResponse {
        signals: analyze_authenticity_signals(&document),
        summary,
        filename: document.filename,
        file_hash: document.sha256,
        file_size: document.size,
        document_type: document.document_type,
    }))
}

pub async fn history(State(state): State<AppState>) -> Json<Vec<AnalysisOutcome>> {
    Json(state.history.read().await.clone())
}

pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.history.write().await.clear();
    StatusCode::NO_CONTENT
}

pub async fn export_report(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, ApiError> {
    let outcome = state
        .history
        .read()
        .await
        .iter()
        .rev()
        .find(|outcome| outcome.file_hash == hash)
        .cloned()
        .ok_or_else(|| AnalystError::NotFound {
            message: format!("no analysis for document {}", hash),
        })?;

    let body = ExportReport::new(outcome).to_json()?;
    let disposition = format!("attachment; filename=\"{}\"", export_filename(Local::now()));

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    limit: Option<usize>,
}

pub async fn audit_events(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Json(state.audit.recent_events(limit).await)
}
