//! Step execution contracts: payload types, failure tagging, checkpoints.

use super::domain::{ReviewDecision, RunFailure, RunId, StepId};
use super::hooks::HookError;
use super::providers::ProviderError;
use super::store::{RunStore, StoreError};
use chrono::Utc;
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

/// Underlying cause of a step failure.
#[derive(Debug, Error)]
pub enum StepCause {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error("{0}")]
    Precondition(String),
}

/// A step error tagged with the step it originated from.
///
/// Returned to the run driver rather than thrown; the driver is the single
/// place that converts one of these into durable failed state.
#[derive(Debug, Error)]
#[error("step '{step}' failed: {cause}")]
pub struct StepFailure {
    pub step: StepId,
    #[source]
    pub cause: StepCause,
}

impl StepFailure {
    pub fn new(step: StepId, cause: impl Into<StepCause>) -> Self {
        Self {
            step,
            cause: cause.into(),
        }
    }

    /// A hook wait woken by cancellation rather than a real error.
    pub fn is_wait_cancelled(&self) -> bool {
        matches!(self.cause, StepCause::Hook(HookError::Cancelled { .. }))
    }

    pub fn to_run_failure(&self) -> RunFailure {
        RunFailure {
            failed_step: self.step,
            message: self.cause.to_string(),
            trace: error_trace(&self.cause),
            occurred_at: Utc::now(),
        }
    }
}

/// Renders the error and its source chain, one frame per line.
fn error_trace(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str("\ncaused by: ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Step 3 output: the branch the run takes after the fraud verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePath {
    ManualReview,
    AutoApprove,
}

/// Step 4 output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    Approved,
    Rejected,
    AutoApproved,
}

impl StepDecision {
    pub const fn label(self) -> &'static str {
        match self {
            StepDecision::Approved => "approved",
            StepDecision::Rejected => "rejected",
            StepDecision::AutoApproved => "auto_approved",
        }
    }

    pub const fn is_rejected(self) -> bool {
        matches!(self, StepDecision::Rejected)
    }
}

impl From<ReviewDecision> for StepDecision {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => Self::Approved,
            ReviewDecision::Rejected => Self::Rejected,
        }
    }
}

impl fmt::Display for StepDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Step 5 output: the decision folded with the background result. A failed
/// check downgrades any decision to rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundOutcome {
    pub decision: StepDecision,
    pub passed: bool,
}

/// Runs one step body, tags any failure with the step identifier, and
/// records the checkpoint once the body's side effects are durable.
/// Checkpoint write failures are logged and swallowed.
pub(crate) struct StepExecutor<'a, S> {
    store: &'a S,
    run_id: RunId,
}

impl<'a, S: RunStore> StepExecutor<'a, S> {
    pub(crate) fn new(store: &'a S, run_id: RunId) -> Self {
        Self { store, run_id }
    }

    pub(crate) async fn run<T, F>(&self, step: StepId, body: F) -> Result<T, StepFailure>
    where
        F: Future<Output = Result<T, StepCause>>,
    {
        debug!(run_id = %self.run_id, step = step.slug(), "step started");
        let output = body.await.map_err(|cause| StepFailure { step, cause })?;
        if let Err(err) = self.store.record_step(&self.run_id, step) {
            warn!(
                run_id = %self.run_id,
                step = step.slug(),
                error = %err,
                "failed to record step checkpoint"
            );
        }
        debug!(run_id = %self.run_id, step = step.slug(), "step completed");
        Ok(output)
    }
}
