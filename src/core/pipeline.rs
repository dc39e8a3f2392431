use crate::core::audit::AuditLog;
use crate::core::intake::validate_upload;
use crate::core::metadata::extract_pdf_text;
use crate::core::prompts::{
    default_follow_up_questions, financial_analysis_with_text, follow_up_prompt,
    synthesis_prompt, visual_inspection_prompt, ANALYST_SYSTEM_PROMPT,
    FINANCIAL_ANALYSIS_PROMPT, PDF_VISUAL_NOTE,
};
use crate::core::report::{parse_questions, parse_report, MIN_FOLLOW_UP_QUESTIONS};
use crate::core::retention::DocumentStore;
use crate::core::signals::analyze_authenticity_signals;
use crate::domain::model::{
    AnalysisOutcome, AnalysisReport, AuthenticitySignals, ChatMessage, ChatRequest, Document,
    DocumentKind, Upload,
};
use crate::domain::ports::{AssessedDocument, ChatModel, Pipeline, Storage};
use crate::utils::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use std::sync::Arc;

/// Characters of extracted PDF text sent with the financial prompt.
pub const MAX_CONTEXT_CHARS: usize = 12_000;
const MAX_TEXT_PAGES: usize = 10;

pub struct DocumentPipeline<S: Storage> {
    model: Arc<dyn ChatModel>,
    store: Arc<DocumentStore>,
    audit: Arc<AuditLog<S>>,
    max_file_size: usize,
}

impl<S: Storage> DocumentPipeline<S> {
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<DocumentStore>,
        audit: Arc<AuditLog<S>>,
        max_file_size: usize,
    ) -> Self {
        Self {
            model,
            store,
            audit,
            max_file_size,
        }
    }

    fn data_url(document: &Document) -> String {
        format!(
            "data:{};base64,{}",
            document.kind.mime_type(),
            STANDARD.encode(&document.data)
        )
    }

    async fn inspect_visually(&self, document: &Document) -> Result<String> {
        if !document.kind.is_image() {
            return Ok(PDF_VISUAL_NOTE.to_string());
        }

        let prompt = visual_inspection_prompt(document.document_type.label());
        let request = ChatRequest::new(vec![ChatMessage::user_with_image(
            prompt,
            Self::data_url(document),
        )])
        .vision();
        self.model.complete(request).await
    }

    async fn analyze_financials(&self, document: &Document) -> Result<String> {
        let request = match document.kind {
            DocumentKind::Pdf => {
                let text = extract_pdf_text(&document.data, MAX_TEXT_PAGES)
                    .map(|t| t.chars().take(MAX_CONTEXT_CHARS).collect::<String>())
                    .unwrap_or_else(|| {
                        "(no extractable text; the PDF may be scanned or image-only)".to_string()
                    });
                ChatRequest::new(vec![
                    ChatMessage::system(ANALYST_SYSTEM_PROMPT),
                    ChatMessage::user(financial_analysis_with_text(
                        document.document_type.label(),
                        &text,
                    )),
                ])
            }
            DocumentKind::Png | DocumentKind::Jpeg => {
                let prompt = format!(
                    "{}\n\nDocument type: {}",
                    FINANCIAL_ANALYSIS_PROMPT,
                    document.document_type.label()
                );
                ChatRequest::new(vec![
                    ChatMessage::system(ANALYST_SYSTEM_PROMPT),
                    ChatMessage::user_with_image(prompt, Self::data_url(document)),
                ])
                .vision()
            }
        };
        self.model.complete(request).await
    }

    async fn synthesize(
        &self,
        document: &Document,
        signals: &AuthenticitySignals,
        visual: &str,
        financial: &str,
    ) -> Result<(AnalysisReport, String)> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(ANALYST_SYSTEM_PROMPT),
            ChatMessage::user(synthesis_prompt(document, signals, visual, financial)),
        ])
        .json();
        let raw = self.model.complete(request).await?;
        let report = parse_report(&raw)?;
        Ok((report, raw))
    }

    /// Asks for more questions; any failure falls back to the defaults.
    async fn follow_up_questions(&self, analysis: &str) -> Vec<String> {
        let request = ChatRequest::new(vec![ChatMessage::user(follow_up_prompt(analysis))]);
        let generated = match self.model.complete(request).await {
            Ok(text) => parse_questions(&text),
            Err(e) => Err(e),
        };

        match generated {
            Ok(questions) if questions.len() >= MIN_FOLLOW_UP_QUESTIONS => questions,
            Ok(questions) => {
                tracing::debug!("Only {} follow-up questions generated", questions.len());
                top_up(questions, default_follow_up_questions())
            }
            Err(e) => {
                tracing::warn!("Follow-up generation failed, using defaults: {}", e);
                default_follow_up_questions()
            }
        }
    }
}

fn top_up(mut questions: Vec<String>, defaults: Vec<String>) -> Vec<String> {
    for question in defaults {
        if questions.len() >= MIN_FOLLOW_UP_QUESTIONS {
            break;
        }
        if !questions.contains(&question) {
            questions.push(question);
        }
    }
    questions
}

#[async_trait::async_trait]
impl<S: Storage + 'static> Pipeline for DocumentPipeline<S> {
    async fn intake(&self, upload: Upload) -> Result<Document> {
        let document = validate_upload(upload, self.max_file_size)?;
        self.store.insert(&document).await;
        self.audit
            .log_document_upload(
                &document.sha256,
                &document.filename,
                document.user_id.as_deref(),
                document.size,
            )
            .await;
        Ok(document)
    }

    async fn inspect(&self, document: &Document) -> Result<AuthenticitySignals> {
        Ok(analyze_authenticity_signals(document))
    }

    async fn assess(
        &self,
        document: &Document,
        signals: &AuthenticitySignals,
    ) -> Result<AssessedDocument> {
        let visual_findings = self.inspect_visually(document).await?;
        tracing::debug!("Visual inspection: {} chars", visual_findings.len());

        let financial_findings = self.analyze_financials(document).await?;
        tracing::debug!("Financial analysis: {} chars", financial_findings.len());

        let (mut report, raw) = self
            .synthesize(document, signals, &visual_findings, &financial_findings)
            .await?;

        if report.follow_up_questions.len() < MIN_FOLLOW_UP_QUESTIONS {
            let existing = std::mem::take(&mut report.follow_up_questions);
            let generated = self.follow_up_questions(&raw).await;
            report.follow_up_questions = if existing.is_empty() {
                generated
            } else {
                top_up(existing, generated)
            };
        }

        Ok(AssessedDocument {
            visual_findings,
            financial_findings,
            report,
        })
    }

    async fn record(
        &self,
        document: &Document,
        signals: AuthenticitySignals,
        assessed: AssessedDocument,
    ) -> Result<AnalysisOutcome> {
        let result_length = serde_json::to_string(&assessed.report)?.len();
        self.audit
            .log_document_analysis(
                &document.sha256,
                &document.filename,
                document.user_id.as_deref(),
                result_length,
            )
            .await;

        Ok(AnalysisOutcome {
            file_hash: document.sha256.clone(),
            filename: document.filename.clone(),
            document_type: document.document_type,
            file_size: document.size,
            analyzed_at: Utc::now(),
            signals,
            visual_findings: assessed.visual_findings,
            financial_findings: assessed.financial_findings,
            report: assessed.report,
        })
    }
}
