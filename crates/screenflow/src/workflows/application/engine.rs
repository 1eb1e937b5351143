//! The orchestrator: sequences the six steps, persists progress, suspends
//! and resumes runs, and converts step failures into durable state.

use super::domain::{
    DocumentExtraction, ReviewDecision, ReviewRequest, ReviewStatus, ReviewToken, RunId,
    RunStatus, RunStatusView, StepId, SubjectDocument, SubjectId, SubjectIntake, SubjectRecord,
    SubjectStatus, WorkflowRun,
};
use super::fraud::{self, FraudAnalysis};
use super::hooks::{HookChannel, ReviewEvent};
use super::providers::{BackgroundCheck, DocumentAnalyzer, ProviderError};
use super::steps::{
    BackgroundOutcome, RoutePath, StepCause, StepDecision, StepExecutor, StepFailure,
};
use super::store::{RunStore, StoreError};
use crate::config::WorkflowConfig;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Timeouts applied to outbound provider calls. The review wait itself is
/// deliberately unbounded.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub document_analysis_timeout: Duration,
    pub background_check_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            document_analysis_timeout: Duration::from_secs(30),
            background_check_timeout: Duration::from_secs(45),
        }
    }
}

impl From<&WorkflowConfig> for EngineConfig {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            document_analysis_timeout: Duration::from_secs(config.document_analysis_timeout_secs),
            background_check_timeout: Duration::from_secs(config.background_check_timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("subject {0} not found")]
    SubjectNotFound(SubjectId),
    #[error("subject {0} has no workflow runs")]
    RunNotFound(SubjectId),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identifiers handed back when an intake starts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunHandle {
    pub subject_id: SubjectId,
    pub run_id: RunId,
}

enum PipelineOutcome {
    Completed,
    Cancelled,
}

/// Drives the six-step review pipeline for each subject.
///
/// The engine owns the review hook channel and is generic over the injected
/// store and providers. Every public operation validates against persisted
/// state, so two engine instances over the same store agree on what is
/// allowed. Run execution happens on detached tasks; callers get the run
/// identifier back immediately and poll [`WorkflowEngine::run_status`].
pub struct WorkflowEngine<S, D, B> {
    store: Arc<S>,
    analyzer: Arc<D>,
    checker: Arc<B>,
    hooks: HookChannel<ReviewEvent>,
    config: EngineConfig,
}

impl<S, D, B> WorkflowEngine<S, D, B>
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    pub fn new(
        store: Arc<S>,
        analyzer: Arc<D>,
        checker: Arc<B>,
        config: EngineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            analyzer,
            checker,
            hooks: HookChannel::new(),
            config,
        })
    }

    /// Creates the subject record and starts its first run.
    pub fn submit(self: &Arc<Self>, intake: SubjectIntake) -> Result<RunHandle, EngineError> {
        let record = self.store.insert_subject(intake)?;
        let run_id = self.start(record.subject_id)?;
        Ok(RunHandle {
            subject_id: record.subject_id,
            run_id,
        })
    }

    /// Starts a run for an existing subject and begins step 1 on a detached
    /// task. At most one active run may exist per subject; a second start
    /// is a caller error, never silently merged.
    pub fn start(self: &Arc<Self>, subject_id: SubjectId) -> Result<RunId, EngineError> {
        if self.store.subject(subject_id)?.is_none() {
            return Err(EngineError::SubjectNotFound(subject_id));
        }
        if let Some(active) = self.store.active_run(subject_id)? {
            return Err(EngineError::InvalidState(format!(
                "subject {subject_id} already has run {} in status '{}'",
                active.run_id, active.status
            )));
        }

        let run = WorkflowRun::new(subject_id);
        let run_id = run.run_id;
        self.store.insert_run(run)?;
        self.store.set_run_status(&run_id, RunStatus::Running)?;
        info!(%run_id, %subject_id, "workflow run started");
        self.spawn_driver(run_id, subject_id, StepId::ExtractDocuments);
        Ok(run_id)
    }

    /// Creates and starts a fresh run after a failure. Valid only while the
    /// latest run is `failed`; that run's record is preserved for audit and
    /// the new run restarts from step 1.
    pub fn retry(self: &Arc<Self>, subject_id: SubjectId) -> Result<RunId, EngineError> {
        let latest = self
            .store
            .latest_run(subject_id)?
            .ok_or(EngineError::RunNotFound(subject_id))?;
        if latest.status != RunStatus::Failed {
            return Err(EngineError::InvalidState(format!(
                "cannot retry a run in status '{}', only failed runs are retryable",
                latest.status
            )));
        }

        // A pending review request the failed run never consumed would
        // otherwise block the new run from suspending.
        let token = ReviewToken::for_subject(subject_id);
        if self.store.discard_pending_review(&token)? {
            debug!(%subject_id, "discarded unconsumed review request from failed run");
        }

        let run = WorkflowRun::new(subject_id);
        let run_id = run.run_id;
        self.store.insert_run(run)?;
        self.store.set_run_status(&run_id, RunStatus::Retrying)?;
        self.store.set_run_status(&run_id, RunStatus::Running)?;
        info!(%run_id, %subject_id, failed_run = %latest.run_id, "retrying failed workflow");
        self.spawn_driver(run_id, subject_id, StepId::ExtractDocuments);
        Ok(run_id)
    }

    /// Delivers a human decision to a run paused for review. Refused when
    /// no pending request exists for the token or the run is not paused;
    /// a second delivery after the first is consumed is refused as well.
    pub fn deliver_review_decision(
        &self,
        token: &ReviewToken,
        decision: ReviewDecision,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        let request = match self.store.review_request(token)? {
            Some(request) => request,
            None => {
                return Err(EngineError::InvalidState(format!(
                    "no review request exists for token '{token}'"
                )))
            }
        };
        if request.status != ReviewStatus::Pending {
            return Err(EngineError::InvalidState(format!(
                "review for token '{token}' was already completed"
            )));
        }
        let run = self
            .store
            .run(&request.run_id)?
            .ok_or(EngineError::RunNotFound(request.subject_id))?;
        if run.status != RunStatus::PausedForReview {
            return Err(EngineError::InvalidState(format!(
                "cannot submit a decision while the run status is '{}', expected 'paused_for_review'",
                run.status
            )));
        }

        self.hooks
            .deliver(token, ReviewEvent { decision, reason })
            .map_err(|err| EngineError::InvalidState(err.to_string()))?;
        info!(
            subject_id = %request.subject_id,
            run_id = %request.run_id,
            decision = %decision,
            "review decision delivered"
        );
        Ok(())
    }

    /// Cancels the subject's active run. The driver observes the terminal
    /// status at the next step boundary; a run parked on the review wait is
    /// woken immediately, and its pending request is discarded.
    pub fn cancel(&self, subject_id: SubjectId) -> Result<RunId, EngineError> {
        let active = match self.store.active_run(subject_id)? {
            Some(run) => run,
            None => {
                return Err(EngineError::InvalidState(format!(
                    "subject {subject_id} has no active run to cancel"
                )))
            }
        };

        self.store
            .set_run_status(&active.run_id, RunStatus::Cancelled)?;
        let token = ReviewToken::for_subject(subject_id);
        self.store.discard_pending_review(&token)?;
        self.hooks.cancel(&token);
        info!(run_id = %active.run_id, %subject_id, "workflow run cancelled");
        Ok(active.run_id)
    }

    /// Read-only projection for status polling.
    pub fn run_status(&self, subject_id: SubjectId) -> Result<RunStatusView, EngineError> {
        let subject = self
            .store
            .subject(subject_id)?
            .ok_or(EngineError::SubjectNotFound(subject_id))?;
        let run = self
            .store
            .latest_run(subject_id)?
            .ok_or(EngineError::RunNotFound(subject_id))?;
        Ok(RunStatusView::project(&run, subject.fraud.as_ref()))
    }

    /// Re-enters interrupted runs from persisted state alone. Call once at
    /// boot, before the service accepts traffic. Returns how many runs were
    /// picked up.
    pub fn recover(self: &Arc<Self>) -> Result<usize, EngineError> {
        let mut resumed = 0;

        for run in self.store.runs_with_status(RunStatus::PausedForReview)? {
            info!(run_id = %run.run_id, subject_id = %run.subject_id, "re-arming paused run");
            self.spawn_driver(run.run_id, run.subject_id, StepId::AwaitHumanDecision);
            resumed += 1;
        }

        for run in self.store.runs_with_status(RunStatus::Running)? {
            let entry = match run
                .last_completed_step
                .map_or(Some(StepId::ExtractDocuments), StepId::next)
            {
                Some(step) => step,
                None => {
                    // All six steps checkpointed; only the terminal status
                    // write was lost.
                    self.store
                        .set_run_status(&run.run_id, RunStatus::Completed)?;
                    info!(run_id = %run.run_id, "run finalized during recovery");
                    resumed += 1;
                    continue;
                }
            };
            info!(
                run_id = %run.run_id,
                subject_id = %run.subject_id,
                entry = entry.slug(),
                "resuming interrupted run"
            );
            self.spawn_driver(run.run_id, run.subject_id, entry);
            resumed += 1;
        }

        // Runs caught before their first status write restart from scratch.
        for status in [RunStatus::Idle, RunStatus::Retrying] {
            for run in self.store.runs_with_status(status)? {
                self.store.set_run_status(&run.run_id, RunStatus::Running)?;
                info!(run_id = %run.run_id, subject_id = %run.subject_id, "starting stalled run");
                self.spawn_driver(run.run_id, run.subject_id, StepId::ExtractDocuments);
                resumed += 1;
            }
        }

        Ok(resumed)
    }

    fn spawn_driver(self: &Arc<Self>, run_id: RunId, subject_id: SubjectId, entry: StepId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.drive(run_id, subject_id, entry).await;
        });
    }

    /// Run-level handler: the single place a step failure becomes durable
    /// failed state.
    async fn drive(self: Arc<Self>, run_id: RunId, subject_id: SubjectId, entry: StepId) {
        match self.execute_pipeline(run_id, subject_id, entry).await {
            Ok(PipelineOutcome::Completed) => {
                info!(%run_id, %subject_id, "workflow run completed");
            }
            Ok(PipelineOutcome::Cancelled) => {
                info!(%run_id, %subject_id, "workflow run stopped after cancellation");
            }
            Err(failure) => {
                error!(
                    %run_id,
                    %subject_id,
                    step = failure.step.slug(),
                    error = %failure,
                    "workflow run failed"
                );
                if let Err(err) = self.store.record_failure(&run_id, failure.to_run_failure()) {
                    error!(%run_id, error = %err, "failed to record run failure");
                }
            }
        }
    }

    /// Executes the pipeline from `entry` onward. Outputs of steps before
    /// `entry` are rehydrated from the store instead of recomputed.
    async fn execute_pipeline(
        &self,
        run_id: RunId,
        subject_id: SubjectId,
        entry: StepId,
    ) -> Result<PipelineOutcome, StepFailure> {
        let steps = StepExecutor::new(self.store.as_ref(), run_id);

        let analysis = if entry <= StepId::FraudAnalysis {
            let extractions = if entry <= StepId::ExtractDocuments {
                steps
                    .run(StepId::ExtractDocuments, self.extract_documents(subject_id))
                    .await?
            } else {
                self.stored_extractions(subject_id)
                    .map_err(|cause| StepFailure::new(entry, cause))?
            };
            if self.cancelled(run_id, StepId::FraudAnalysis)? {
                return Ok(PipelineOutcome::Cancelled);
            }
            steps
                .run(
                    StepId::FraudAnalysis,
                    self.fraud_analysis(subject_id, extractions),
                )
                .await?
        } else {
            self.stored_analysis(subject_id)
                .map_err(|cause| StepFailure::new(entry, cause))?
        };
        if self.cancelled(run_id, StepId::RouteDecision)? {
            return Ok(PipelineOutcome::Cancelled);
        }

        let path = if entry <= StepId::RouteDecision {
            steps
                .run(
                    StepId::RouteDecision,
                    self.route_decision(subject_id, &analysis),
                )
                .await?
        } else if analysis.needs_review() {
            RoutePath::ManualReview
        } else {
            RoutePath::AutoApprove
        };
        if self.cancelled(run_id, StepId::AwaitHumanDecision)? {
            return Ok(PipelineOutcome::Cancelled);
        }

        let decision = if entry <= StepId::AwaitHumanDecision {
            let wait = steps.run(
                StepId::AwaitHumanDecision,
                self.await_human_decision(run_id, subject_id, path),
            );
            match wait.await {
                Ok(decision) => decision,
                Err(failure) if failure.is_wait_cancelled() => {
                    return if self.cancelled(run_id, StepId::AwaitHumanDecision)? {
                        Ok(PipelineOutcome::Cancelled)
                    } else {
                        Err(failure)
                    };
                }
                Err(failure) => return Err(failure),
            }
        } else {
            self.stored_decision(run_id, subject_id)
                .map_err(|cause| StepFailure::new(entry, cause))?
        };
        if self.cancelled(run_id, StepId::BackgroundCheck)? {
            return Ok(PipelineOutcome::Cancelled);
        }

        let outcome = if entry <= StepId::BackgroundCheck {
            steps
                .run(
                    StepId::BackgroundCheck,
                    self.background_check(subject_id, decision),
                )
                .await?
        } else {
            self.stored_background(subject_id, decision)
                .map_err(|cause| StepFailure::new(entry, cause))?
        };
        if self.cancelled(run_id, StepId::FinalizeApplication)? {
            return Ok(PipelineOutcome::Cancelled);
        }

        steps
            .run(
                StepId::FinalizeApplication,
                self.finalize_application(subject_id, outcome),
            )
            .await?;

        self.store
            .set_run_status(&run_id, RunStatus::Completed)
            .map_err(|err| StepFailure::new(StepId::FinalizeApplication, StepCause::Store(err)))?;
        Ok(PipelineOutcome::Completed)
    }

    /// Step-boundary cancellation check.
    fn cancelled(&self, run_id: RunId, at: StepId) -> Result<bool, StepFailure> {
        let run = self
            .store
            .run(&run_id)
            .map_err(|err| StepFailure::new(at, StepCause::Store(err)))?;
        Ok(matches!(run, Some(run) if run.status == RunStatus::Cancelled))
    }

    /// Step 1: fan extraction out across the subject's documents and join
    /// all-or-nothing before step 2.
    async fn extract_documents(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<DocumentExtraction>, StepCause> {
        let record = self.subject_record(subject_id)?;
        debug!(%subject_id, documents = record.documents.len(), "extracting documents");

        let mut tasks = Vec::with_capacity(record.documents.len());
        for document in record.documents {
            let analyzer = Arc::clone(&self.analyzer);
            let store = Arc::clone(&self.store);
            let deadline = self.config.document_analysis_timeout;
            tasks.push(tokio::spawn(async move {
                extract_one(
                    analyzer.as_ref(),
                    store.as_ref(),
                    subject_id,
                    document,
                    deadline,
                )
                .await
            }));
        }

        let mut extractions = Vec::with_capacity(tasks.len());
        for joined in join_all(tasks).await {
            let result = joined.map_err(|err| {
                StepCause::Precondition(format!("extraction task panicked: {err}"))
            })?;
            extractions.push(result?);
        }
        Ok(extractions)
    }

    /// Step 2: score the extractions and persist the verdict on the subject.
    async fn fraud_analysis(
        &self,
        subject_id: SubjectId,
        extractions: Vec<DocumentExtraction>,
    ) -> Result<FraudAnalysis, StepCause> {
        let analysis = fraud::analyze(&extractions);
        self.store.record_fraud_analysis(subject_id, &analysis)?;
        info!(
            %subject_id,
            score = analysis.score,
            confidence = analysis.confidence,
            signals = analysis.signals.len(),
            needs_review = analysis.needs_review(),
            "fraud analysis recorded"
        );
        Ok(analysis)
    }

    /// Step 3: branch on the verdict; the manual path also moves the
    /// subject into processing.
    async fn route_decision(
        &self,
        subject_id: SubjectId,
        analysis: &FraudAnalysis,
    ) -> Result<RoutePath, StepCause> {
        if analysis.needs_review() {
            self.store
                .set_subject_status(subject_id, SubjectStatus::Processing)?;
            info!(%subject_id, score = analysis.score, "routing to manual review");
            Ok(RoutePath::ManualReview)
        } else {
            info!(%subject_id, score = analysis.score, "routing to auto-approval");
            Ok(RoutePath::AutoApprove)
        }
    }

    /// Step 4: persist the pending request and the paused status, then park
    /// until the decision event arrives. Pass-through on the auto-approve
    /// path; a decision already recorded for this run short-circuits the
    /// wait so replays never ask the reviewer twice.
    async fn await_human_decision(
        &self,
        run_id: RunId,
        subject_id: SubjectId,
        path: RoutePath,
    ) -> Result<StepDecision, StepCause> {
        if path == RoutePath::AutoApprove {
            debug!(%subject_id, "no review required, continuing");
            return Ok(StepDecision::AutoApproved);
        }

        let token = ReviewToken::for_subject(subject_id);
        match self.store.review_request(&token)? {
            Some(request)
                if request.run_id == run_id && request.status == ReviewStatus::Completed =>
            {
                let decision = request.decision.ok_or_else(|| {
                    StepCause::Precondition(format!(
                        "completed review for token '{token}' is missing its decision"
                    ))
                })?;
                self.hooks.cancel(&token);
                self.store.set_run_status(&run_id, RunStatus::Running)?;
                info!(%run_id, %subject_id, decision = %decision, "review already decided, resuming");
                return Ok(StepDecision::from(decision));
            }
            Some(request)
                if request.run_id == run_id && request.status == ReviewStatus::Pending =>
            {
                // Re-entry after a restart: the pending request still stands.
            }
            _ => {
                self.store.insert_review_request(ReviewRequest::pending(
                    token.clone(),
                    subject_id,
                    run_id,
                ))?;
            }
        }

        self.store
            .set_run_status(&run_id, RunStatus::PausedForReview)?;
        info!(%run_id, %subject_id, token = %token, "run paused for human review");

        let event = self.hooks.wait(&token).await?;

        self.store
            .complete_review_request(&token, event.decision, event.reason.clone())?;
        // A duplicate event that raced the wakeup would otherwise sit in the
        // channel and leak into the next run for this token.
        self.hooks.cancel(&token);
        self.store.set_run_status(&run_id, RunStatus::Running)?;
        info!(%run_id, %subject_id, decision = %event.decision, "review decision received");
        Ok(StepDecision::from(event.decision))
    }

    /// Step 5: call the screening provider unless the reviewer already
    /// rejected; a failed check downgrades the decision to rejected.
    async fn background_check(
        &self,
        subject_id: SubjectId,
        decision: StepDecision,
    ) -> Result<BackgroundOutcome, StepCause> {
        if decision.is_rejected() {
            debug!(%subject_id, "skipping background check for rejected application");
            self.store.record_background_result(subject_id, false)?;
            return Ok(BackgroundOutcome {
                decision,
                passed: false,
            });
        }

        let deadline = self.config.background_check_timeout;
        let passed = match timeout(deadline, self.checker.check(subject_id)).await {
            Ok(result) => result?,
            Err(_) => return Err(StepCause::Provider(ProviderError::Timeout(deadline))),
        };
        self.store.record_background_result(subject_id, passed)?;
        info!(%subject_id, passed, "background check finished");

        let decision = if passed {
            decision
        } else {
            StepDecision::Rejected
        };
        Ok(BackgroundOutcome { decision, passed })
    }

    /// Step 6: final subject status plus the conditional flip of extracted
    /// documents to verified.
    async fn finalize_application(
        &self,
        subject_id: SubjectId,
        outcome: BackgroundOutcome,
    ) -> Result<(), StepCause> {
        let status = if outcome.decision.is_rejected() {
            SubjectStatus::Rejected
        } else {
            SubjectStatus::Approved
        };
        self.store.set_subject_status(subject_id, status)?;
        let verified = self.store.verify_extracted_documents(subject_id)?;
        info!(%subject_id, status = %status, documents_verified = verified, "application finalized");
        Ok(())
    }

    fn subject_record(&self, subject_id: SubjectId) -> Result<SubjectRecord, StepCause> {
        self.store.subject(subject_id)?.ok_or_else(|| {
            StepCause::Precondition(format!("subject {subject_id} does not exist"))
        })
    }

    /// Rebuilds step 1's output from the extracted documents on record.
    fn stored_extractions(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<DocumentExtraction>, StepCause> {
        let record = self.subject_record(subject_id)?;
        let mut extractions = Vec::with_capacity(record.documents.len());
        for document in record.documents {
            match (document.extracted_data, document.confidence) {
                (Some(data), Some(confidence)) => extractions.push(DocumentExtraction {
                    document_id: document.document_id,
                    kind: document.kind,
                    data,
                    confidence,
                }),
                _ => {
                    return Err(StepCause::Precondition(format!(
                        "document {} has no extraction to resume from",
                        document.document_id
                    )))
                }
            }
        }
        Ok(extractions)
    }

    /// Rebuilds step 2's output from the verdict stored on the subject.
    fn stored_analysis(&self, subject_id: SubjectId) -> Result<FraudAnalysis, StepCause> {
        let record = self.subject_record(subject_id)?;
        record.fraud.ok_or_else(|| {
            StepCause::Precondition(format!(
                "subject {subject_id} has no recorded fraud analysis to resume from"
            ))
        })
    }

    /// Rebuilds step 4's output. A request from an earlier run does not
    /// bind this one; its absence means the auto-approve path was taken.
    fn stored_decision(
        &self,
        run_id: RunId,
        subject_id: SubjectId,
    ) -> Result<StepDecision, StepCause> {
        let token = ReviewToken::for_subject(subject_id);
        match self.store.review_request(&token)? {
            Some(request) if request.run_id == run_id => match request.status {
                ReviewStatus::Completed => {
                    let decision = request.decision.ok_or_else(|| {
                        StepCause::Precondition(format!(
                            "completed review for token '{token}' is missing its decision"
                        ))
                    })?;
                    Ok(StepDecision::from(decision))
                }
                ReviewStatus::Pending => Err(StepCause::Precondition(format!(
                    "review for token '{token}' is still pending"
                ))),
            },
            _ => Ok(StepDecision::AutoApproved),
        }
    }

    /// Rebuilds step 5's output from the stored background result.
    fn stored_background(
        &self,
        subject_id: SubjectId,
        decision: StepDecision,
    ) -> Result<BackgroundOutcome, StepCause> {
        let record = self.subject_record(subject_id)?;
        let passed = record.background_passed.ok_or_else(|| {
            StepCause::Precondition(format!(
                "subject {subject_id} has no background result to resume from"
            ))
        })?;
        let decision = if passed {
            decision
        } else {
            StepDecision::Rejected
        };
        Ok(BackgroundOutcome { decision, passed })
    }
}

async fn extract_one<D, S>(
    analyzer: &D,
    store: &S,
    subject_id: SubjectId,
    document: SubjectDocument,
    deadline: Duration,
) -> Result<DocumentExtraction, StepCause>
where
    D: DocumentAnalyzer,
    S: RunStore,
{
    let analyzed = match timeout(deadline, analyzer.analyze(&document.reference, document.kind)).await
    {
        Ok(Ok(analyzed)) => analyzed,
        Ok(Err(err)) => return Err(extraction_failed(store, subject_id, &document, err.into())),
        Err(_) => {
            return Err(extraction_failed(
                store,
                subject_id,
                &document,
                ProviderError::Timeout(deadline).into(),
            ))
        }
    };

    store.record_extraction(
        subject_id,
        document.document_id,
        analyzed.data.clone(),
        analyzed.confidence,
    )?;
    debug!(
        %subject_id,
        document_id = document.document_id,
        kind = document.kind.label(),
        confidence = analyzed.confidence,
        "document extracted"
    );
    Ok(DocumentExtraction {
        document_id: document.document_id,
        kind: document.kind,
        data: analyzed.data,
        confidence: analyzed.confidence,
    })
}

/// Marks the document failed before surfacing the extraction error.
fn extraction_failed<S: RunStore>(
    store: &S,
    subject_id: SubjectId,
    document: &SubjectDocument,
    cause: StepCause,
) -> StepCause {
    if let Err(err) = store.mark_extraction_failed(subject_id, document.document_id) {
        warn!(
            %subject_id,
            document_id = document.document_id,
            error = %err,
            "failed to mark document extraction as failed"
        );
    }
    cause
}
