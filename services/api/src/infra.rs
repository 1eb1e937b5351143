use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use screenflow::workflows::application::{
    AnalyzedDocument, DocumentAnalyzer, DocumentKind, ProviderError, ReviewDecision,
    StubDocumentAnalyzer,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Analyzer used by the demo: canned stub output except where a document
/// reference carries a scripted override.
#[derive(Default)]
pub(crate) struct ScriptedDocumentAnalyzer {
    overrides: HashMap<String, AnalyzedDocument>,
}

impl ScriptedDocumentAnalyzer {
    pub(crate) fn with_override(mut self, reference: &str, document: AnalyzedDocument) -> Self {
        self.overrides.insert(reference.to_string(), document);
        self
    }
}

#[async_trait]
impl DocumentAnalyzer for ScriptedDocumentAnalyzer {
    async fn analyze(
        &self,
        reference: &str,
        kind: DocumentKind,
    ) -> Result<AnalyzedDocument, ProviderError> {
        match self.overrides.get(reference) {
            Some(document) => Ok(document.clone()),
            None => StubDocumentAnalyzer.analyze(reference, kind).await,
        }
    }
}

pub(crate) fn parse_decision(raw: &str) -> Result<ReviewDecision, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approved" | "approve" => Ok(ReviewDecision::Approved),
        "rejected" | "reject" => Ok(ReviewDecision::Rejected),
        other => Err(format!(
            "'{other}' is not a review decision (expected approved or rejected)"
        )),
    }
}
