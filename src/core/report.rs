//! Shape validation for the model's JSON verdict.
//!
//! The model is prompted, not guaranteed, to return the report shape, so
//! every field is checked here before an [`AnalysisReport`] exists.

use crate::domain::model::{AnalysisReport, Recommendation};
use crate::utils::error::{AnalystError, Result};
use serde::Deserialize;

pub const MIN_FOLLOW_UP_QUESTIONS: usize = 3;
pub const MAX_FOLLOW_UP_QUESTIONS: usize = 5;

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(alias = "score")]
    authenticity_score: f64,
    #[serde(default)]
    red_flags: Vec<String>,
    #[serde(default)]
    positive_signals: Vec<String>,
    #[serde(default, alias = "questions")]
    follow_up_questions: Vec<String>,
    recommendation: String,
    #[serde(default)]
    summary: Option<String>,
}

/// Strips Markdown code fences and returns the outermost JSON value
/// delimited by `open`/`close`.
fn extract_json(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn parse_report(text: &str) -> Result<AnalysisReport> {
    let json = extract_json(text, '{', '}').ok_or_else(|| AnalystError::MalformedResponse {
        message: "no JSON object found in model output".to_string(),
    })?;

    let raw: RawReport = serde_json::from_str(json).map_err(|e| AnalystError::MalformedResponse {
        message: format!("invalid report JSON: {}", e),
    })?;

    if !raw.authenticity_score.is_finite()
        || raw.authenticity_score < 0.0
        || raw.authenticity_score > 100.0
    {
        return Err(AnalystError::MalformedResponse {
            message: format!(
                "authenticity_score {} is outside 0-100",
                raw.authenticity_score
            ),
        });
    }

    let recommendation: Recommendation = raw.recommendation.parse()?;

    let mut follow_up_questions = clean_list(raw.follow_up_questions);
    follow_up_questions.truncate(MAX_FOLLOW_UP_QUESTIONS);

    Ok(AnalysisReport {
        authenticity_score: raw.authenticity_score.round() as u8,
        red_flags: clean_list(raw.red_flags),
        positive_signals: clean_list(raw.positive_signals),
        follow_up_questions,
        recommendation,
        summary: raw.summary.unwrap_or_default().trim().to_string(),
    })
}

/// Parses a JSON array of question strings, capped at the maximum.
pub fn parse_questions(text: &str) -> Result<Vec<String>> {
    let json = extract_json(text, '[', ']').ok_or_else(|| AnalystError::MalformedResponse {
        message: "no JSON array found in model output".to_string(),
    })?;
    let questions: Vec<String> =
        serde_json::from_str(json).map_err(|e| AnalystError::MalformedResponse {
            message: format!("invalid question list: {}", e),
        })?;
    let mut questions = clean_list(questions);
    questions.truncate(MAX_FOLLOW_UP_QUESTIONS);
    if questions.is_empty() {
        return Err(AnalystError::MalformedResponse {
            message: "question list is empty".to_string(),
        });
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "authenticity_score": 72,
        "red_flags": ["Balance math does not reconcile on page 2", "  "],
        "positive_signals": ["Bank logo and routing number present"],
        "follow_up_questions": ["Q1?", "Q2?", "Q3?"],
        "recommendation": "review",
        "summary": "Mostly consistent."
    }"#;

    #[test]
    fn test_parses_valid_report() {
        let report = parse_report(VALID).unwrap();
        assert_eq!(report.authenticity_score, 72);
        assert_eq!(report.red_flags.len(), 1);
        assert_eq!(report.recommendation, Recommendation::Review);
        assert_eq!(report.follow_up_questions.len(), 3);
        assert_eq!(report.summary, "Mostly consistent.");
    }

    #[test]
    fn test_accepts_fenced_output() {
        let fenced = format!("Here is the analysis:\n```json\n{}\n```", VALID);
        assert!(parse_report(&fenced).is_ok());
    }

    #[test]
    fn test_rejects_score_out_of_range() {
        let text = VALID.replace("72", "140");
        assert!(matches!(
            parse_report(&text),
            Err(AnalystError::MalformedResponse { .. })
        ));
        let text = VALID.replace("72", "-1");
        assert!(parse_report(&text).is_err());
    }

    #[test]
    fn test_rounds_fractional_score() {
        let text = VALID.replace("72", "88.6");
        assert_eq!(parse_report(&text).unwrap().authenticity_score, 89);
    }

    #[test]
    fn test_rejects_unknown_recommendation() {
        let text = VALID.replace("\"review\"", "\"escalate\"");
        assert!(matches!(
            parse_report(&text),
            Err(AnalystError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_fields_and_prose() {
        assert!(parse_report(r#"{"red_flags": []}"#).is_err());
        assert!(parse_report("The document looks authentic. Approve.").is_err());
    }

    #[test]
    fn test_truncates_extra_questions() {
        let text = VALID.replace(
            r#"["Q1?", "Q2?", "Q3?"]"#,
            r#"["Q1?", "Q2?", "Q3?", "Q4?", "Q5?", "Q6?", "Q7?"]"#,
        );
        assert_eq!(parse_report(&text).unwrap().follow_up_questions.len(), 5);
    }

    #[test]
    fn test_parse_questions() {
        let questions = parse_questions("```json\n[\"Why the round deposit?\", \"\"]\n```").unwrap();
        assert_eq!(questions, vec!["Why the round deposit?".to_string()]);
        assert!(parse_questions("[]").is_err());
        assert!(parse_questions("no list").is_err());
    }
}
