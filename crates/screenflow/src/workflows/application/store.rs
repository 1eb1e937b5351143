//! Persistence contract for runs, subjects, and review requests.

use super::domain::{
    ReviewDecision, ReviewRequest, ReviewToken, RunFailure, RunId, RunStatus, StepId, SubjectId,
    SubjectIntake, SubjectRecord, SubjectStatus, WorkflowRun,
};
use super::fraud::FraudAnalysis;
use serde_json::Value;

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Storage abstraction injected into the engine so the pipeline can be
/// exercised in isolation.
///
/// The store is the sole resumption truth: run status, `last_completed_step`,
/// pending review requests, and the subject-level step outputs all live behind
/// this trait, and together they are everything the engine needs to re-enter
/// an interrupted run. Updates are field-scoped rather than whole-record
/// writes, and the conditional operations exist so replayed steps stay
/// idempotent.
pub trait RunStore: Send + Sync {
    fn insert_run(&self, run: WorkflowRun) -> Result<(), StoreError>;
    fn run(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, StoreError>;
    /// The most recently started run for a subject, regardless of status.
    fn latest_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError>;
    /// The subject's run in a non-terminal status, if any.
    fn active_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError>;
    /// All runs currently in `status`; used by the recovery scan at boot.
    fn runs_with_status(&self, status: RunStatus) -> Result<Vec<WorkflowRun>, StoreError>;
    fn set_run_status(&self, run_id: &RunId, status: RunStatus) -> Result<(), StoreError>;
    /// Monotonic checkpoint write: recording a step at or before the current
    /// `last_completed_step` is a no-op, never a regression.
    fn record_step(&self, run_id: &RunId, step: StepId) -> Result<(), StoreError>;
    /// Marks the run failed and attaches the failure detail.
    fn record_failure(&self, run_id: &RunId, failure: RunFailure) -> Result<(), StoreError>;

    /// Creates the subject record with its documents in `pending` state,
    /// assigning subject and document identifiers.
    fn insert_subject(&self, intake: SubjectIntake) -> Result<SubjectRecord, StoreError>;
    fn subject(&self, subject_id: SubjectId) -> Result<Option<SubjectRecord>, StoreError>;
    fn set_subject_status(
        &self,
        subject_id: SubjectId,
        status: SubjectStatus,
    ) -> Result<(), StoreError>;
    fn record_fraud_analysis(
        &self,
        subject_id: SubjectId,
        analysis: &FraudAnalysis,
    ) -> Result<(), StoreError>;
    fn record_background_result(
        &self,
        subject_id: SubjectId,
        passed: bool,
    ) -> Result<(), StoreError>;

    /// Stores one document's extraction output and moves it to `extracted`.
    /// Safe to repeat with the same data.
    fn record_extraction(
        &self,
        subject_id: SubjectId,
        document_id: u64,
        data: Value,
        confidence: f64,
    ) -> Result<(), StoreError>;
    fn mark_extraction_failed(
        &self,
        subject_id: SubjectId,
        document_id: u64,
    ) -> Result<(), StoreError>;
    /// Conditional update: only documents currently `extracted` move to
    /// `verified`. Returns how many moved.
    fn verify_extracted_documents(&self, subject_id: SubjectId) -> Result<usize, StoreError>;

    /// Refuses a second pending request for the same token; a completed
    /// request from an earlier run is replaced.
    fn insert_review_request(&self, request: ReviewRequest) -> Result<(), StoreError>;
    fn review_request(&self, token: &ReviewToken) -> Result<Option<ReviewRequest>, StoreError>;
    /// Completes a pending request exactly once; completing twice is a
    /// conflict.
    fn complete_review_request(
        &self,
        token: &ReviewToken,
        decision: ReviewDecision,
        reason: Option<String>,
    ) -> Result<(), StoreError>;
    /// Removes the token's request if it is still pending. Returns whether a
    /// request was removed; completed requests stay untouched.
    fn discard_pending_review(&self, token: &ReviewToken) -> Result<bool, StoreError>;
}
