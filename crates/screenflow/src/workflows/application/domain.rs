use super::fraud::{FraudAnalysis, FraudSignal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Identifier of the application being processed (the run's subject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(pub u64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one execution attempt of the pipeline. Assigned at run
/// start, never reused; a retry allocates a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addressing key that routes one review decision event to one suspended
/// run. Derived deterministically from the subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewToken(String);

impl ReviewToken {
    pub fn for_subject(subject_id: SubjectId) -> Self {
        Self(format!("app-{subject_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReviewToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed six-step pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    ExtractDocuments,
    FraudAnalysis,
    RouteDecision,
    AwaitHumanDecision,
    BackgroundCheck,
    FinalizeApplication,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::ExtractDocuments,
        StepId::FraudAnalysis,
        StepId::RouteDecision,
        StepId::AwaitHumanDecision,
        StepId::BackgroundCheck,
        StepId::FinalizeApplication,
    ];

    /// One-based position in the pipeline; drives progress percentages.
    pub const fn number(self) -> u8 {
        match self {
            StepId::ExtractDocuments => 1,
            StepId::FraudAnalysis => 2,
            StepId::RouteDecision => 3,
            StepId::AwaitHumanDecision => 4,
            StepId::BackgroundCheck => 5,
            StepId::FinalizeApplication => 6,
        }
    }

    pub const fn slug(self) -> &'static str {
        match self {
            StepId::ExtractDocuments => "extract_documents",
            StepId::FraudAnalysis => "fraud_analysis",
            StepId::RouteDecision => "route_decision",
            StepId::AwaitHumanDecision => "await_human_decision",
            StepId::BackgroundCheck => "background_check",
            StepId::FinalizeApplication => "finalize_application",
        }
    }

    pub const fn next(self) -> Option<StepId> {
        match self {
            StepId::ExtractDocuments => Some(StepId::FraudAnalysis),
            StepId::FraudAnalysis => Some(StepId::RouteDecision),
            StepId::RouteDecision => Some(StepId::AwaitHumanDecision),
            StepId::AwaitHumanDecision => Some(StepId::BackgroundCheck),
            StepId::BackgroundCheck => Some(StepId::FinalizeApplication),
            StepId::FinalizeApplication => None,
        }
    }

    /// Percentage of the pipeline completed once `last_completed` is durable.
    pub fn progress_percentage(last_completed: Option<StepId>) -> u8 {
        let completed = last_completed.map(StepId::number).unwrap_or(0) as f64;
        let total = StepId::ALL.len() as f64;
        ((completed / total) * 100.0).round() as u8
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Lifecycle of a workflow run.
///
/// `idle` exists only between run creation and the first status write;
/// `retrying` marks the fresh run an operator retry creates before it
/// starts executing. `failed` is sticky until a retry creates a new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    PausedForReview,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::PausedForReview => "paused_for_review",
            RunStatus::Retrying => "retrying",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// A run in an active status blocks a second run for the same subject.
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            RunStatus::Idle | RunStatus::Running | RunStatus::PausedForReview | RunStatus::Retrying
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured failure record, present only while a run is `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    pub failed_step: StepId,
    pub message: String,
    pub trace: String,
    pub occurred_at: DateTime<Utc>,
}

/// Durable record of one execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: RunId,
    pub subject_id: SubjectId,
    pub status: RunStatus,
    pub last_completed_step: Option<StepId>,
    pub failure: Option<RunFailure>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRun {
    pub fn new(subject_id: SubjectId) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::generate(),
            subject_id,
            status: RunStatus::Idle,
            last_completed_step: None,
            failure: None,
            started_at: now,
            updated_at: now,
        }
    }
}

/// Outcome a human reviewer submits for a paused run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewDecision::Approved => "approved",
            ReviewDecision::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Completed,
}

/// Review request row created when a run suspends. At most one pending
/// request may exist per token; completion happens exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub token: ReviewToken,
    pub subject_id: SubjectId,
    pub run_id: RunId,
    pub status: ReviewStatus,
    pub decision: Option<ReviewDecision>,
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl ReviewRequest {
    pub fn pending(token: ReviewToken, subject_id: SubjectId, run_id: RunId) -> Self {
        Self {
            token,
            subject_id,
            run_id,
            status: ReviewStatus::Pending,
            decision: None,
            reason: None,
            requested_at: Utc::now(),
            decided_at: None,
        }
    }
}

/// Business status of the application itself, distinct from run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectStatus {
    Submitted,
    Processing,
    Approved,
    Rejected,
}

impl SubjectStatus {
    pub const fn label(self) -> &'static str {
        match self {
            SubjectStatus::Submitted => "submitted",
            SubjectStatus::Processing => "processing",
            SubjectStatus::Approved => "approved",
            SubjectStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PayStub,
    TaxReturn,
    IdVerification,
}

impl DocumentKind {
    pub const fn label(self) -> &'static str {
        match self {
            DocumentKind::PayStub => "pay_stub",
            DocumentKind::TaxReturn => "tax_return",
            DocumentKind::IdVerification => "id_verification",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-document verification lifecycle: `pending` at intake, `extracted`
/// once analysis succeeds, `verified` after finalization, `failed` when
/// the analysis provider rejects the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Extracted,
    Verified,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectDocument {
    pub document_id: u64,
    pub kind: DocumentKind,
    pub reference: String,
    pub verification: VerificationStatus,
    pub extracted_data: Option<Value>,
    pub confidence: Option<f64>,
}

/// The application record the pipeline's side effects land on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub subject_id: SubjectId,
    pub applicant_name: String,
    pub status: SubjectStatus,
    pub fraud: Option<FraudAnalysis>,
    pub background_passed: Option<bool>,
    pub documents: Vec<SubjectDocument>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intake payload for a new application.
#[derive(Debug, Clone, Deserialize)]
pub struct SubjectIntake {
    pub applicant_name: String,
    #[serde(default)]
    pub documents: Vec<DocumentIntake>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentIntake {
    pub kind: DocumentKind,
    pub reference: String,
}

/// One document's extraction output, input to the fraud analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentExtraction {
    pub document_id: u64,
    pub kind: DocumentKind,
    pub data: Value,
    pub confidence: f64,
}

/// Read-only projection served to status-polling clients.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub subject_id: SubjectId,
    pub run_id: RunId,
    pub status: RunStatus,
    pub last_completed_step: Option<StepId>,
    pub progress_percentage: u8,
    pub steps: Vec<StepProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_signals: Option<Vec<FraudSignal>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Current,
    Pending,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    pub step: StepId,
    pub number: u8,
    pub state: StepState,
}

impl RunStatusView {
    pub fn project(run: &WorkflowRun, fraud: Option<&FraudAnalysis>) -> Self {
        let last_number = run.last_completed_step.map(StepId::number).unwrap_or(0);
        let failed_step = match run.status {
            RunStatus::Failed => run.failure.as_ref().map(|failure| failure.failed_step),
            _ => None,
        };

        let steps = StepId::ALL
            .iter()
            .map(|step| {
                let state = if step.number() <= last_number {
                    StepState::Completed
                } else if failed_step == Some(*step) {
                    StepState::Failed
                } else if run.status.is_active() && step.number() == last_number + 1 {
                    StepState::Current
                } else {
                    StepState::Pending
                };
                StepProgress {
                    step: *step,
                    number: step.number(),
                    state,
                }
            })
            .collect();

        Self {
            subject_id: run.subject_id,
            run_id: run.run_id,
            status: run.status,
            last_completed_step: run.last_completed_step,
            progress_percentage: StepId::progress_percentage(run.last_completed_step),
            steps,
            error: match run.status {
                RunStatus::Failed => run.failure.clone(),
                _ => None,
            },
            fraud_score: fraud.map(|analysis| analysis.score),
            fraud_signals: fraud.map(|analysis| analysis.signals.clone()),
        }
    }
}
