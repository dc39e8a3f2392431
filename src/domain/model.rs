use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AnalystError;

/// Content kinds accepted for upload, identified from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentType {
    #[default]
    #[serde(rename = "bank_statement")]
    BankStatement,
    #[serde(rename = "tax_return_w2")]
    TaxReturnW2,
    #[serde(rename = "tax_return_1099")]
    TaxReturn1099,
    #[serde(rename = "pay_stub")]
    PayStub,
    #[serde(rename = "investment_statement")]
    InvestmentStatement,
    #[serde(rename = "other")]
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        Self::BankStatement,
        Self::TaxReturnW2,
        Self::TaxReturn1099,
        Self::PayStub,
        Self::InvestmentStatement,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::BankStatement => "Bank Statement",
            Self::TaxReturnW2 => "Tax Return (W-2)",
            Self::TaxReturn1099 => "Tax Return (1099)",
            Self::PayStub => "Pay Stub",
            Self::InvestmentStatement => "Investment Statement",
            Self::Other => "Other Financial Document",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::BankStatement => "bank_statement",
            Self::TaxReturnW2 => "tax_return_w2",
            Self::TaxReturn1099 => "tax_return_1099",
            Self::PayStub => "pay_stub",
            Self::InvestmentStatement => "investment_statement",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DocumentType {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let normalized = wanted.to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.slug() == normalized || t.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AnalystError::ValidationError {
                message: format!(
                    "Unknown document type '{}'. Expected one of: {}",
                    s,
                    Self::ALL.map(|t| t.slug()).join(", ")
                ),
            })
    }
}

/// Raw upload as received from the form or the command line.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
    pub document_type: DocumentType,
    pub user_id: Option<String>,
}

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub kind: DocumentKind,
    pub document_type: DocumentType,
    pub sha256: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
    pub user_id: Option<String>,
    pub data: Vec<u8>,
}

impl Document {
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentMetadata {
    Pdf(PdfMetadata),
    Image(ImageMetadata),
    Unreadable { error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub num_pages: usize,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub text_extractable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub color: String,
    pub dpi: Option<(f64, f64)>,
    pub exif_present: bool,
    pub exif_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticitySignals {
    pub red_flags: Vec<String>,
    pub positive_signals: Vec<String>,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Review,
    RequestMore,
    Deny,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Review => "review",
            Self::RequestMore => "request_more",
            Self::Deny => "deny",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "approve" => Ok(Self::Approve),
            "review" => Ok(Self::Review),
            "request_more" => Ok(Self::RequestMore),
            "deny" => Ok(Self::Deny),
            other => Err(AnalystError::MalformedResponse {
                message: format!(
                    "recommendation '{}' is not one of approve, review, request_more, deny",
                    other
                ),
            }),
        }
    }
}

/// Verdict returned by the model after shape validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub authenticity_score: u8,
    pub red_flags: Vec<String>,
    pub positive_signals: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub file_hash: String,
    pub filename: String,
    pub document_type: DocumentType,
    pub file_size: usize,
    pub analyzed_at: DateTime<Utc>,
    pub signals: AuthenticitySignals,
    pub visual_findings: String,
    pub financial_findings: String,
    pub report: AnalysisReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// User turn carrying a prompt and an inline base64 image.
    pub fn user_with_image(text: impl Into<String>, data_url: String) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_url,
                        detail: Some("high".to_string()),
                    },
                },
            ]),
        }
    }
}

/// Which configured model a request should go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Reasoning,
    Vision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub json_response: bool,
    pub role: ModelRole,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            json_response: false,
            role: ModelRole::Reasoning,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn vision(mut self) -> Self {
        self.role = ModelRole::Vision;
        self
    }
}
