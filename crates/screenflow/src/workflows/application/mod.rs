//! Rental application review pipeline.
//!
//! A submitted application is processed by a six-step durable run: document
//! extraction, fraud analysis, routing, an optional human-review pause, a
//! background check, and finalization. The engine checkpoints progress after
//! every step through the injected [`store::RunStore`], so a run interrupted
//! by a restart resumes from persisted state, and a run paused for review
//! holds no thread while it waits for the decision event.

pub mod domain;
pub mod engine;
pub mod fraud;
pub mod hooks;
mod memory;
pub mod providers;
pub mod router;
pub mod steps;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    DocumentExtraction, DocumentIntake, DocumentKind, ReviewDecision, ReviewRequest, ReviewStatus,
    ReviewToken, RunFailure, RunId, RunStatus, RunStatusView, StepId, StepProgress, StepState,
    SubjectDocument, SubjectId, SubjectIntake, SubjectRecord, SubjectStatus, VerificationStatus,
    WorkflowRun,
};
pub use engine::{EngineConfig, EngineError, RunHandle, WorkflowEngine};
pub use fraud::{FraudAnalysis, FraudSignal, SignalKind, SignalSeverity};
pub use hooks::{HookChannel, HookError, ReviewEvent};
pub use memory::MemoryRunStore;
pub use providers::{
    AnalyzedDocument, BackgroundCheck, DocumentAnalyzer, ProviderError, StubBackgroundCheck,
    StubDocumentAnalyzer,
};
pub use router::application_router;
pub use steps::{BackgroundOutcome, RoutePath, StepDecision, StepFailure};
pub use store::{RunStore, StoreError};
