use crate::domain::model::AnalysisOutcome;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Downloadable analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub outcome: AnalysisOutcome,
}

impl ExportReport {
    pub fn new(outcome: AnalysisOutcome) -> Self {
        Self {
            timestamp: Utc::now(),
            success: true,
            outcome,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn export_filename(now: DateTime<Local>) -> String {
    format!("analysis_report_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Writes the report and returns the path it was stored under.
pub async fn write_report<S: Storage>(
    storage: &S,
    report: &ExportReport,
    path: Option<&str>,
) -> Result<String> {
    let path = match path {
        Some(path) => path.to_string(),
        None => export_filename(Local::now()),
    };
    storage.write_file(&path, report.to_json()?.as_bytes()).await?;
    tracing::info!("Exported analysis report to {}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalStorage;
    use crate::domain::model::{
        AnalysisReport, AuthenticitySignals, DocumentMetadata, DocumentType, Recommendation,
    };
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn outcome() -> AnalysisOutcome {
        AnalysisOutcome {
            file_hash: "ab".repeat(32),
            filename: "statement.pdf".to_string(),
            document_type: DocumentType::BankStatement,
            file_size: 2048,
            analyzed_at: Utc::now(),
            signals: AuthenticitySignals {
                red_flags: vec![],
                positive_signals: vec!["Created with legitimate software: Adobe".to_string()],
                metadata: DocumentMetadata::Unreadable {
                    error: "n/a".to_string(),
                },
            },
            visual_findings: "note".to_string(),
            financial_findings: "steady deposits".to_string(),
            report: AnalysisReport {
                authenticity_score: 90,
                red_flags: vec![],
                positive_signals: vec![],
                follow_up_questions: vec!["Q?".to_string()],
                recommendation: Recommendation::Approve,
                summary: String::new(),
            },
        }
    }

    #[test]
    fn test_export_filename_format() {
        let now = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(export_filename(now), "analysis_report_20240301_090507.json");
    }

    #[test]
    fn test_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&ExportReport::new(outcome()).to_json().unwrap()).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["outcome"]["report"]["recommendation"], "approve");
        assert_eq!(json["outcome"]["report"]["authenticity_score"], 90);
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_write_report_to_storage() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let report = ExportReport::new(outcome());

        let path = write_report(&storage, &report, Some("out/report.json"))
            .await
            .unwrap();
        assert_eq!(path, "out/report.json");
        let written = std::fs::read_to_string(temp_dir.path().join("out/report.json")).unwrap();
        assert!(written.contains("\"success\": true"));

        let default_path = write_report(&storage, &report, None).await.unwrap();
        assert!(default_path.starts_with("analysis_report_"));
    }
}
