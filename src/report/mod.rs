//! Agreement report rendering
//!
//! The renderer takes the structured funding summary and produces the
//! stored agreement document. The trait keeps the rendering backend
//! swappable (a PDF backend slots in without touching the pipeline); the
//! default implementation renders a self-contained HTML document.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::loan::LoanDetail;

/// Structured data the agreement document is rendered from.
#[derive(Debug, Clone)]
pub struct AgreementReport {
    pub loan_id: Uuid,
    pub proposed_by: Uuid,
    pub principal: i64,
    pub rate: f64,
    pub duration_month: i32,
    pub approval_date: Option<DateTime<Utc>>,
    pub total_investment: i64,
    pub investor_count: usize,
}

impl AgreementReport {
    pub fn from_detail(detail: &LoanDetail, rate: f64, investor_count: usize) -> Self {
        AgreementReport {
            loan_id: detail.loan_id,
            proposed_by: detail.proposed_by,
            principal: detail.amount,
            rate,
            duration_month: detail.duration_month,
            approval_date: detail.approval_date,
            total_investment: detail.total_investment,
            investor_count,
        }
    }
}

/// A rendered document ready for storage.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_ext: &'static str,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render agreement document: {0}")]
    Render(String),
}

/// Document renderer contract.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, report: &AgreementReport) -> Result<RenderedDocument, RenderError>;
}

/// Default HTML renderer.
#[derive(Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentRenderer for HtmlRenderer {
    fn render(&self, report: &AgreementReport) -> Result<RenderedDocument, RenderError> {
        let approval_date = report
            .approval_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Investment Agreement {loan_id}</title>
</head>
<body>
    <h1>Investment Agreement</h1>
    <table>
        <tr><td>Loan ID</td><td>{loan_id}</td></tr>
        <tr><td>Applicant</td><td>{proposed_by}</td></tr>
        <tr><td>Principal</td><td>{principal}</td></tr>
        <tr><td>Interest rate</td><td>{rate}</td></tr>
        <tr><td>Duration (months)</td><td>{duration}</td></tr>
        <tr><td>Approval date</td><td>{approval_date}</td></tr>
        <tr><td>Total invested</td><td>{total_investment}</td></tr>
        <tr><td>Investors</td><td>{investor_count}</td></tr>
    </table>
    <p>Generated at {generated_at}.</p>
</body>
</html>
"#,
            loan_id = report.loan_id,
            proposed_by = report.proposed_by,
            principal = report.principal,
            rate = report.rate,
            duration = report.duration_month,
            approval_date = approval_date,
            total_investment = report.total_investment,
            investor_count = report.investor_count,
            generated_at = Utc::now().to_rfc3339(),
        );

        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            content_type: "text/html",
            file_ext: ".html",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_renderer_includes_key_fields() {
        let loan_id = Uuid::new_v4();
        let report = AgreementReport {
            loan_id,
            proposed_by: Uuid::new_v4(),
            principal: 1_000_000,
            rate: 0.1,
            duration_month: 12,
            approval_date: Some(Utc::now()),
            total_investment: 1_000_000,
            investor_count: 2,
        };

        let doc = HtmlRenderer::new().render(&report).unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();

        assert!(html.contains(&loan_id.to_string()));
        assert!(html.contains("1000000"));
        assert!(html.contains("0.1"));
        assert_eq!(doc.content_type, "text/html");
        assert_eq!(doc.file_ext, ".html");
    }
}
