use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::application::domain::{
    DocumentIntake, DocumentKind, ReviewDecision, ReviewRequest, ReviewToken, RunFailure, RunId,
    RunStatus, StepId, SubjectId, SubjectIntake, SubjectRecord, SubjectStatus, WorkflowRun,
};
use crate::workflows::application::fraud::FraudAnalysis;
use crate::workflows::application::providers::{
    AnalyzedDocument, DocumentAnalyzer, ProviderError, StubBackgroundCheck, StubDocumentAnalyzer,
};
use crate::workflows::application::store::{RunStore, StoreError};
use crate::workflows::application::{BackgroundCheck, EngineConfig, MemoryRunStore, WorkflowEngine};

pub(super) const PAY_STUB_REF: &str = "uploads/pay-stub.pdf";
pub(super) const TAX_RETURN_REF: &str = "uploads/tax-return.pdf";
pub(super) const ID_REF: &str = "uploads/id.pdf";

pub(super) fn full_intake() -> SubjectIntake {
    SubjectIntake {
        applicant_name: "Jane Renter".to_string(),
        documents: vec![
            DocumentIntake {
                kind: DocumentKind::PayStub,
                reference: PAY_STUB_REF.to_string(),
            },
            DocumentIntake {
                kind: DocumentKind::TaxReturn,
                reference: TAX_RETURN_REF.to_string(),
            },
            DocumentIntake {
                kind: DocumentKind::IdVerification,
                reference: ID_REF.to_string(),
            },
        ],
    }
}

/// Pay stub reporting income far above the tax-return equivalent; routes
/// the run to manual review through the income mismatch signal.
pub(super) fn inflated_pay_stub() -> AnalyzedDocument {
    AnalyzedDocument {
        data: json!({
            "employer_name": "Acme Corp",
            "monthly_income": 8000,
            "pay_period": "2024-01-01 to 2024-01-15",
        }),
        confidence: 0.85,
    }
}

/// Analyzer returning canned stub output except where a reference has a
/// scripted override.
pub(super) struct ScriptedAnalyzer {
    overrides: HashMap<String, AnalyzedDocument>,
}

impl ScriptedAnalyzer {
    pub(super) fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub(super) fn with_override(mut self, reference: &str, document: AnalyzedDocument) -> Self {
        self.overrides.insert(reference.to_string(), document);
        self
    }
}

#[async_trait]
impl DocumentAnalyzer for ScriptedAnalyzer {
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

pub(super) struct FailingAnalyzer;

#[async_trait]
impl DocumentAnalyzer for FailingAnalyzer {
    async fn analyze(
        &self,
        _reference: &str,
        _kind: DocumentKind,
    ) -> Result<AnalyzedDocument, ProviderError> {
        Err(ProviderError::Unavailable("document AI offline".to_string()))
    }
}

/// Store double delegating to [`MemoryRunStore`] with switchable faults and
/// a checkpoint recorder.
pub(super) struct FaultStore {
    inner: MemoryRunStore,
    pub(super) fail_fraud_writes: AtomicBool,
    pub(super) fail_step_records: AtomicBool,
    recorded_steps: Mutex<Vec<(RunId, StepId)>>,
}

impl FaultStore {
    pub(super) fn new() -> Self {
        Self {
            inner: MemoryRunStore::new(),
            fail_fraud_writes: AtomicBool::new(false),
            fail_step_records: AtomicBool::new(false),
            recorded_steps: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn recorded_steps(&self, run_id: RunId) -> Vec<StepId> {
        self.recorded_steps
            .lock()
            .expect("step recorder mutex poisoned")
            .iter()
            .filter(|(recorded, _)| *recorded == run_id)
            .map(|(_, step)| *step)
            .collect()
    }
}

impl RunStore for FaultStore {
    fn insert_run(&self, run: WorkflowRun) -> Result<(), StoreError> {
        self.inner.insert_run(run)
    }

    fn run(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, StoreError> {
        self.inner.run(run_id)
    }

    fn latest_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError> {
        self.inner.latest_run(subject_id)
    }

    fn active_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError> {
        self.inner.active_run(subject_id)
    }

    fn runs_with_status(&self, status: RunStatus) -> Result<Vec<WorkflowRun>, StoreError> {
        self.inner.runs_with_status(status)
    }

    fn set_run_status(&self, run_id: &RunId, status: RunStatus) -> Result<(), StoreError> {
        self.inner.set_run_status(run_id, status)
    }

    fn record_step(&self, run_id: &RunId, step: StepId) -> Result<(), StoreError> {
        self.recorded_steps
            .lock()
            .expect("step recorder mutex poisoned")
            .push((*run_id, step));
        if self.fail_step_records.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("tracking endpoint offline".to_string()));
        }
        self.inner.record_step(run_id, step)
    }

    fn record_failure(&self, run_id: &RunId, failure: RunFailure) -> Result<(), StoreError> {
        self.inner.record_failure(run_id, failure)
    }

    fn insert_subject(&self, intake: SubjectIntake) -> Result<SubjectRecord, StoreError> {
        self.inner.insert_subject(intake)
    }

    fn subject(&self, subject_id: SubjectId) -> Result<Option<SubjectRecord>, StoreError> {
        self.inner.subject(subject_id)
    }

    fn set_subject_status(
        &self,
        subject_id: SubjectId,
        status: SubjectStatus,
    ) -> Result<(), StoreError> {
        self.inner.set_subject_status(subject_id, status)
    }

    fn record_fraud_analysis(
        &self,
        subject_id: SubjectId,
        analysis: &FraudAnalysis,
    ) -> Result<(), StoreError> {
        if self.fail_fraud_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("verdict store offline".to_string()));
        }
        self.inner.record_fraud_analysis(subject_id, analysis)
    }

    fn record_background_result(
        &self,
        subject_id: SubjectId,
        passed: bool,
    ) -> Result<(), StoreError> {
        self.inner.record_background_result(subject_id, passed)
    }

    fn record_extraction(
        &self,
        subject_id: SubjectId,
        document_id: u64,
        data: Value,
        confidence: f64,
    ) -> Result<(), StoreError> {
        self.inner
            .record_extraction(subject_id, document_id, data, confidence)
    }

    fn mark_extraction_failed(
        &self,
        subject_id: SubjectId,
        document_id: u64,
    ) -> Result<(), StoreError> {
        self.inner.mark_extraction_failed(subject_id, document_id)
    }

    fn verify_extracted_documents(&self, subject_id: SubjectId) -> Result<usize, StoreError> {
        self.inner.verify_extracted_documents(subject_id)
    }

    fn insert_review_request(&self, request: ReviewRequest) -> Result<(), StoreError> {
        self.inner.insert_review_request(request)
    }

    fn review_request(&self, token: &ReviewToken) -> Result<Option<ReviewRequest>, StoreError> {
        self.inner.review_request(token)
    }

    fn complete_review_request(
        &self,
        token: &ReviewToken,
        decision: ReviewDecision,
        reason: Option<String>,
    ) -> Result<(), StoreError> {
        self.inner.complete_review_request(token, decision, reason)
    }

    fn discard_pending_review(&self, token: &ReviewToken) -> Result<bool, StoreError> {
        self.inner.discard_pending_review(token)
    }
}

pub(super) fn engine_over<S, D, B>(
    store: Arc<S>,
    analyzer: D,
    checker: B,
) -> Arc<WorkflowEngine<S, D, B>>
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    WorkflowEngine::new(
        store,
        Arc::new(analyzer),
        Arc::new(checker),
        EngineConfig::default(),
    )
}

pub(super) fn stub_engine() -> (
    Arc<WorkflowEngine<MemoryRunStore, StubDocumentAnalyzer, StubBackgroundCheck>>,
    Arc<MemoryRunStore>,
) {
    let store = Arc::new(MemoryRunStore::new());
    let engine = engine_over(store.clone(), StubDocumentAnalyzer, StubBackgroundCheck::passing());
    (engine, store)
}

pub(super) fn flagged_engine() -> (
    Arc<WorkflowEngine<MemoryRunStore, ScriptedAnalyzer, StubBackgroundCheck>>,
    Arc<MemoryRunStore>,
) {
    let store = Arc::new(MemoryRunStore::new());
    let analyzer = ScriptedAnalyzer::new().with_override(PAY_STUB_REF, inflated_pay_stub());
    let engine = engine_over(store.clone(), analyzer, StubBackgroundCheck::passing());
    (engine, store)
}

/// Polls until the run reaches `status`; panics when it never does.
pub(super) async fn wait_for_status<S: RunStore>(
    store: &S,
    run_id: RunId,
    status: RunStatus,
) -> WorkflowRun {
    for _ in 0..400 {
        if let Ok(Some(run)) = store.run(&run_id) {
            if run.status == status {
                return run;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run {run_id} never reached status '{status}'");
}

pub(super) fn subject_of<S: RunStore>(store: &S, subject_id: SubjectId) -> SubjectRecord {
    store
        .subject(subject_id)
        .expect("subject lookup succeeds")
        .expect("subject record present")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
