use super::domain::{
    ReviewDecision, ReviewRequest, ReviewStatus, ReviewToken, RunFailure, RunId, RunStatus,
    StepId, SubjectDocument, SubjectId, SubjectIntake, SubjectRecord, SubjectStatus,
    VerificationStatus, WorkflowRun,
};
use super::fraud::FraudAnalysis;
use super::store::{RunStore, StoreError};
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory [`RunStore`] backed by per-key concurrent maps.
///
/// Each run, subject, and review request is an independent map entry, so
/// concurrent runs update their own records without contending on a store
/// lock. Run identifiers per subject are kept in insertion order to answer
/// latest/active queries.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: DashMap<RunId, WorkflowRun>,
    run_order: DashMap<SubjectId, Vec<RunId>>,
    subjects: DashMap<SubjectId, SubjectRecord>,
    reviews: DashMap<String, ReviewRequest>,
    subject_seq: AtomicU64,
    document_seq: AtomicU64,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_subject_id(&self) -> SubjectId {
        SubjectId(self.subject_seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn next_document_id(&self) -> u64 {
        self.document_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl RunStore for MemoryRunStore {
    fn insert_run(&self, run: WorkflowRun) -> Result<(), StoreError> {
        let run_id = run.run_id;
        let subject_id = run.subject_id;
        if self.runs.contains_key(&run_id) {
            return Err(StoreError::Conflict);
        }
        self.runs.insert(run_id, run);
        self.run_order.entry(subject_id).or_default().push(run_id);
        Ok(())
    }

    fn run(&self, run_id: &RunId) -> Result<Option<WorkflowRun>, StoreError> {
        Ok(self.runs.get(run_id).map(|entry| entry.clone()))
    }

    fn latest_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError> {
        let last = match self.run_order.get(&subject_id) {
            Some(order) => match order.last() {
                Some(run_id) => *run_id,
                None => return Ok(None),
            },
            None => return Ok(None),
        };
        Ok(self.runs.get(&last).map(|entry| entry.clone()))
    }

    fn active_run(&self, subject_id: SubjectId) -> Result<Option<WorkflowRun>, StoreError> {
        let order: Vec<RunId> = match self.run_order.get(&subject_id) {
            Some(order) => order.clone(),
            None => return Ok(None),
        };
        for run_id in order.iter().rev() {
            if let Some(run) = self.runs.get(run_id) {
                if run.status.is_active() {
                    return Ok(Some(run.clone()));
                }
            }
        }
        Ok(None)
    }

    fn runs_with_status(&self, status: RunStatus) -> Result<Vec<WorkflowRun>, StoreError> {
        Ok(self
            .runs
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.clone())
            .collect())
    }

    fn set_run_status(&self, run_id: &RunId, status: RunStatus) -> Result<(), StoreError> {
        match self.runs.get_mut(run_id) {
            Some(mut run) => {
                run.status = status;
                run.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn record_step(&self, run_id: &RunId, step: StepId) -> Result<(), StoreError> {
        match self.runs.get_mut(run_id) {
            Some(mut run) => {
                let current = run.last_completed_step.map(StepId::number).unwrap_or(0);
                if step.number() > current {
                    run.last_completed_step = Some(step);
                    run.updated_at = Utc::now();
                }
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn record_failure(&self, run_id: &RunId, failure: RunFailure) -> Result<(), StoreError> {
        match self.runs.get_mut(run_id) {
            Some(mut run) => {
                run.status = RunStatus::Failed;
                run.failure = Some(failure);
                run.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_subject(&self, intake: SubjectIntake) -> Result<SubjectRecord, StoreError> {
        let now = Utc::now();
        let subject_id = self.next_subject_id();
        let documents = intake
            .documents
            .into_iter()
            .map(|doc| SubjectDocument {
                document_id: self.next_document_id(),
                kind: doc.kind,
                reference: doc.reference,
                verification: VerificationStatus::Pending,
                extracted_data: None,
                confidence: None,
            })
            .collect();
        let record = SubjectRecord {
            subject_id,
            applicant_name: intake.applicant_name,
            status: SubjectStatus::Submitted,
            fraud: None,
            background_passed: None,
            documents,
            created_at: now,
            updated_at: now,
        };
        self.subjects.insert(subject_id, record.clone());
        Ok(record)
    }

    fn subject(&self, subject_id: SubjectId) -> Result<Option<SubjectRecord>, StoreError> {
        Ok(self.subjects.get(&subject_id).map(|entry| entry.clone()))
    }

    fn set_subject_status(
        &self,
        subject_id: SubjectId,
        status: SubjectStatus,
    ) -> Result<(), StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                record.status = status;
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn record_fraud_analysis(
        &self,
        subject_id: SubjectId,
        analysis: &FraudAnalysis,
    ) -> Result<(), StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                record.fraud = Some(analysis.clone());
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn record_background_result(
        &self,
        subject_id: SubjectId,
        passed: bool,
    ) -> Result<(), StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                record.background_passed = Some(passed);
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn record_extraction(
        &self,
        subject_id: SubjectId,
        document_id: u64,
        data: Value,
        confidence: f64,
    ) -> Result<(), StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                let updated = match record
                    .documents
                    .iter_mut()
                    .find(|doc| doc.document_id == document_id)
                {
                    Some(doc) => {
                        doc.extracted_data = Some(data);
                        doc.confidence = Some(confidence);
                        doc.verification = VerificationStatus::Extracted;
                        true
                    }
                    None => false,
                };
                if !updated {
                    return Err(StoreError::NotFound);
                }
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn mark_extraction_failed(
        &self,
        subject_id: SubjectId,
        document_id: u64,
    ) -> Result<(), StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                let updated = match record
                    .documents
                    .iter_mut()
                    .find(|doc| doc.document_id == document_id)
                {
                    Some(doc) => {
                        doc.verification = VerificationStatus::Failed;
                        true
                    }
                    None => false,
                };
                if !updated {
                    return Err(StoreError::NotFound);
                }
                record.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn verify_extracted_documents(&self, subject_id: SubjectId) -> Result<usize, StoreError> {
        match self.subjects.get_mut(&subject_id) {
            Some(mut record) => {
                let mut verified = 0;
                for doc in record.documents.iter_mut() {
                    if doc.verification == VerificationStatus::Extracted {
                        doc.verification = VerificationStatus::Verified;
                        verified += 1;
                    }
                }
                record.updated_at = Utc::now();
                Ok(verified)
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn insert_review_request(&self, request: ReviewRequest) -> Result<(), StoreError> {
        match self.reviews.entry(request.token.as_str().to_owned()) {
            Entry::Occupied(mut entry) => {
                if entry.get().status == ReviewStatus::Pending {
                    return Err(StoreError::Conflict);
                }
                entry.insert(request);
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(request);
                Ok(())
            }
        }
    }

    fn review_request(&self, token: &ReviewToken) -> Result<Option<ReviewRequest>, StoreError> {
        Ok(self.reviews.get(token.as_str()).map(|entry| entry.clone()))
    }

    fn complete_review_request(
        &self,
        token: &ReviewToken,
        decision: ReviewDecision,
        reason: Option<String>,
    ) -> Result<(), StoreError> {
        match self.reviews.get_mut(token.as_str()) {
            Some(mut request) => {
                if request.status == ReviewStatus::Completed {
                    return Err(StoreError::Conflict);
                }
                request.status = ReviewStatus::Completed;
                request.decision = Some(decision);
                request.reason = reason;
                request.decided_at = Some(Utc::now());
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn discard_pending_review(&self, token: &ReviewToken) -> Result<bool, StoreError> {
        let removed = self
            .reviews
            .remove_if(token.as_str(), |_, request| {
                request.status == ReviewStatus::Pending
            });
        Ok(removed.is_some())
    }
}
