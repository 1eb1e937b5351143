//! Pluggable capability providers called at step boundaries.

use super::domain::{DocumentKind, SubjectId};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),
}

/// Extraction payload returned by the document analysis provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedDocument {
    pub data: Value,
    pub confidence: f64,
}

/// Document analysis capability; an AI extraction service in production.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        reference: &str,
        kind: DocumentKind,
    ) -> Result<AnalyzedDocument, ProviderError>;
}

/// Background screening capability.
#[async_trait]
pub trait BackgroundCheck: Send + Sync {
    async fn check(&self, subject_id: SubjectId) -> Result<bool, ProviderError>;
}

/// Deterministic analyzer returning a canned extraction per document kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubDocumentAnalyzer;

#[async_trait]
impl DocumentAnalyzer for StubDocumentAnalyzer {
    async fn analyze(
        &self,
        _reference: &str,
        kind: DocumentKind,
    ) -> Result<AnalyzedDocument, ProviderError> {
        let document = match kind {
            DocumentKind::PayStub => AnalyzedDocument {
                data: json!({
                    "employer_name": "Acme Corp",
                    "monthly_income": 5000,
                    "pay_period": "2024-01-01 to 2024-01-15",
                }),
                confidence: 0.85,
            },
            DocumentKind::TaxReturn => AnalyzedDocument {
                data: json!({
                    "annual_income": 60000,
                    "tax_year": 2023,
                }),
                confidence: 0.90,
            },
            DocumentKind::IdVerification => AnalyzedDocument {
                data: json!({
                    "full_name": "John Doe",
                    "date_of_birth": "1990-01-01",
                    "address": "123 Main St",
                }),
                confidence: 0.95,
            },
        };
        Ok(document)
    }
}

/// Background check stub with a constructor-fixed outcome.
#[derive(Debug, Clone, Copy)]
pub struct StubBackgroundCheck {
    pass: bool,
}

impl StubBackgroundCheck {
    pub fn passing() -> Self {
        Self { pass: true }
    }

    pub fn failing() -> Self {
        Self { pass: false }
    }
}

impl Default for StubBackgroundCheck {
    fn default() -> Self {
        Self::passing()
    }
}

#[async_trait]
impl BackgroundCheck for StubBackgroundCheck {
    async fn check(&self, _subject_id: SubjectId) -> Result<bool, ProviderError> {
        Ok(self.pass)
    }
}
