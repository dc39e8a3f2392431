//! Prompt templates sent to the chat model.

use crate::domain::model::{AuthenticitySignals, Document};

pub const ANALYST_SYSTEM_PROMPT: &str = r#"You are an expert financial document fraud analyst. Your job is to rigorously analyze uploaded documents to determine authenticity and assess financial credibility.

Your analysis should be:
1. THOROUGH - Consider every piece of evidence provided
2. OBJECTIVE - Present both positive and negative findings
3. DETAILED - Explain your reasoning for each finding
4. ACTIONABLE - Provide clear follow-up questions when confidence is low

Document Types You'll Analyze:
- Bank statements
- Tax returns (W-2, 1099, etc.)
- Pay stubs
- Investment account statements
- Proof of assets

Red Flags to Watch For:
- Inconsistent fonts or formatting
- Suspicious editing software in metadata
- Round numbers or unrealistic patterns
- Missing standard banking elements (logos, account numbers, etc.)
- Poor quality or screenshots instead of originals
- Inconsistent dates or impossible transactions

Always provide:
- Overall authenticity score (0-100)
- List of specific concerns
- Follow-up questions to increase confidence
- Recommendation (approve/review/request_more/deny)"#;

pub fn visual_inspection_prompt(document_type: &str) -> String {
    format!(
        r#"Analyze this {document_type} image for signs of authenticity or fraud.

Look for:
1. **Visual Consistency**: Are fonts, sizes, and spacing consistent throughout?
2. **Professional Quality**: Does it look professionally generated or hand-edited?
3. **Standard Elements**: Are typical banking/financial elements present (logos, routing numbers, formatting)?
4. **Editing Artifacts**: Signs of copy-paste, white-out, or digital manipulation
5. **Screenshot Indicators**: Is this a screenshot vs. original document?
6. **Text Quality**: OCR artifacts, pixelation, or unusual rendering
7. **Suspicious Patterns**: Whited-out sections, alignment issues, color inconsistencies

Provide a detailed visual analysis with specific observations."#
    )
}

pub const PDF_VISUAL_NOTE: &str = "PDF visual inspection requires conversion to image. For best results, upload as PNG/JPG. Unable to perform visual inspection on PDF directly.";

pub const FINANCIAL_ANALYSIS_PROMPT: &str = r#"Based on the financial data visible in the document, analyze:

1. **Income Consistency**: Are income deposits regular and consistent?
2. **Expense Patterns**: Do expenses look realistic for stated income?
3. **Red Flag Transactions**: Unusual large deposits/withdrawals, round numbers
4. **Balance Trends**: Does balance behave realistically over time?
5. **NSF/Overdrafts**: Any bounced payments or overdraft indicators?
6. **Transaction Authenticity**: Do transaction descriptions look legitimate?

Provide specific observations about financial patterns."#;

pub fn financial_analysis_with_text(document_type: &str, text: &str) -> String {
    format!(
        "{FINANCIAL_ANALYSIS_PROMPT}\n\nDocument type: {document_type}\n\nExtracted document text:\n\"\"\"\n{text}\n\"\"\""
    )
}

pub fn synthesis_prompt(
    document: &Document,
    signals: &AuthenticitySignals,
    visual_findings: &str,
    financial_findings: &str,
) -> String {
    let metadata_findings = serde_json::to_string_pretty(signals)
        .unwrap_or_else(|_| "metadata unavailable".to_string());

    format!(
        r#"Analyze the following {document_type} for authenticity and financial credibility:

Filename: {filename}
Size: {size:.2} KB

## Metadata analysis
{metadata_findings}

## Visual inspection
{visual_findings}

## Financial analysis
{financial_findings}

Synthesize these findings and provide:
1. Authenticity score (0-100)
2. List of red flags found
3. List of positive signals
4. 3-5 specific follow-up questions for the customer
5. Recommended action (approve/review/request_more/deny)

Respond with ONLY a JSON object of exactly this shape:
{{
  "authenticity_score": <integer 0-100>,
  "red_flags": ["..."],
  "positive_signals": ["..."],
  "follow_up_questions": ["...", "...", "..."],
  "recommendation": "approve" | "review" | "request_more" | "deny",
  "summary": "<two or three sentence explanation>"
}}"#,
        document_type = document.document_type.label(),
        filename = document.filename,
        size = document.size_kb(),
    )
}

pub fn follow_up_prompt(analysis: &str) -> String {
    format!(
        r#"Based on the following document analysis, generate 3-5 specific, targeted follow-up questions that would help increase confidence in the document's authenticity or clarify concerning findings.

Analysis:
{analysis}

Generate questions that:
1. Address specific red flags or concerns
2. Request additional documentation for verification
3. Ask for clarification on suspicious patterns
4. Are polite but direct
5. Help the customer understand what would strengthen their application

Return ONLY a JSON array of questions, no other text:
["question 1", "question 2", ...]"#
    )
}

pub fn default_follow_up_questions() -> Vec<String> {
    vec![
        "Can you provide the original PDF statement directly from your bank's online portal?".to_string(),
        "Do you have additional months of statements to show consistency?".to_string(),
        "Can you provide a verification contact at your financial institution?".to_string(),
    ]
}
