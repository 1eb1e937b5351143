use crate::infra::ScriptedDocumentAnalyzer;
use clap::Args;
use screenflow::error::AppError;
use screenflow::workflows::application::{
    AnalyzedDocument, DocumentIntake, DocumentKind, EngineConfig, EngineError, MemoryRunStore,
    ReviewDecision, ReviewToken, RunStatus, RunStatusView, RunStore, SignalSeverity,
    StubBackgroundCheck, SubjectId, SubjectIntake, VerificationStatus, WorkflowEngine,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const FLAGGED_PAY_STUB: &str = "uploads/dana/pay-stub.pdf";

type DemoEngine = WorkflowEngine<MemoryRunStore, ScriptedDocumentAnalyzer, StubBackgroundCheck>;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Decision delivered to the flagged application (approved or rejected)
    #[arg(long, default_value = "approved", value_parser = crate::infra::parse_decision)]
    pub(crate) decision: ReviewDecision,
    /// Free-text rationale stored with the review decision
    #[arg(long)]
    pub(crate) reason: Option<String>,
    /// Run only the auto-approve path and skip the flagged applicant
    #[arg(long)]
    pub(crate) skip_review: bool,
}

/// Walks two applications through the pipeline on the command line: one
/// with consistent documents that auto-approves, and one whose pay stub
/// contradicts the tax return, pausing the run for a reviewer decision.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        decision,
        reason,
        skip_review,
    } = args;

    println!("ScreenFlow application screening demo");

    let store = Arc::new(MemoryRunStore::new());
    let analyzer = ScriptedDocumentAnalyzer::default().with_override(
        FLAGGED_PAY_STUB,
        AnalyzedDocument {
            data: json!({
                "employer_name": "Acme Corp",
                "monthly_income": 9200,
                "pay_period": "2024-03-01 to 2024-03-15",
            }),
            confidence: 0.85,
        },
    );
    let engine = WorkflowEngine::new(
        store.clone(),
        Arc::new(analyzer),
        Arc::new(StubBackgroundCheck::passing()),
        EngineConfig::default(),
    );

    println!("\nApplicant 1: consistent documents");
    let clean = engine.submit(clean_intake())?;
    let view = watch_run(&engine, clean.subject_id, |view| view.status.is_terminal()).await?;
    render_run(&view);
    render_subject(store.as_ref(), clean.subject_id)?;

    if skip_review {
        return Ok(());
    }

    println!("\nApplicant 2: pay stub income far above the tax return");
    let flagged = engine.submit(flagged_intake())?;
    let paused = watch_run(&engine, flagged.subject_id, |view| {
        view.status == RunStatus::PausedForReview || view.status.is_terminal()
    })
    .await?;
    render_run(&paused);
    if let Some(signals) = &paused.fraud_signals {
        for signal in signals {
            println!(
                "  ! {} ({}): {}",
                signal.kind,
                severity_label(signal.severity),
                signal.details
            );
        }
    }

    let token = ReviewToken::for_subject(flagged.subject_id);
    println!("- Delivering reviewer decision '{decision}'");
    engine.deliver_review_decision(&token, decision, reason)?;

    let view = watch_run(&engine, flagged.subject_id, |view| view.status.is_terminal()).await?;
    render_run(&view);
    render_subject(store.as_ref(), flagged.subject_id)?;

    Ok(())
}

/// Polls the status view, narrating step completions, until `done` returns
/// true for the current view.
async fn watch_run(
    engine: &DemoEngine,
    subject_id: SubjectId,
    done: impl Fn(&RunStatusView) -> bool,
) -> Result<RunStatusView, AppError> {
    let mut last_progress = None;
    for _ in 0..600 {
        let view = engine.run_status(subject_id)?;
        if last_progress != Some(view.progress_percentage) {
            if let Some(step) = view.last_completed_step {
                println!("  [{:>3}%] {} done", view.progress_percentage, step.slug());
            }
            last_progress = Some(view.progress_percentage);
        }
        if done(&view) {
            return Ok(view);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(AppError::Engine(EngineError::InvalidState(
        "demo run did not settle in time".to_string(),
    )))
}

fn render_run(view: &RunStatusView) {
    println!(
        "- Run {} -> {} ({}% complete)",
        view.run_id, view.status, view.progress_percentage
    );
    if let Some(error) = &view.error {
        println!("  Failed at {}: {}", error.failed_step.slug(), error.message);
    }
}

fn render_subject(store: &MemoryRunStore, subject_id: SubjectId) -> Result<(), AppError> {
    let record = store
        .subject(subject_id)
        .map_err(EngineError::from)?
        .ok_or(EngineError::SubjectNotFound(subject_id))?;

    let verified = record
        .documents
        .iter()
        .filter(|doc| doc.verification == VerificationStatus::Verified)
        .count();
    let background = match record.background_passed {
        Some(true) => "passed",
        Some(false) => "failed",
        None => "not run",
    };
    println!(
        "- {} -> {} | background check {} | {}/{} documents verified",
        record.applicant_name,
        record.status,
        background,
        verified,
        record.documents.len()
    );
    Ok(())
}

fn severity_label(severity: SignalSeverity) -> &'static str {
    match severity {
        SignalSeverity::Low => "low",
        SignalSeverity::Medium => "medium",
        SignalSeverity::High => "high",
    }
}

fn clean_intake() -> SubjectIntake {
    SubjectIntake {
        applicant_name: "Avery Chen".to_string(),
        documents: vec![
            document(DocumentKind::PayStub, "uploads/avery/pay-stub.pdf"),
            document(DocumentKind::TaxReturn, "uploads/avery/tax-return.pdf"),
            document(DocumentKind::IdVerification, "uploads/avery/id.pdf"),
        ],
    }
}

fn flagged_intake() -> SubjectIntake {
    SubjectIntake {
        applicant_name: "Dana Whitfield".to_string(),
        documents: vec![
            document(DocumentKind::PayStub, FLAGGED_PAY_STUB),
            document(DocumentKind::TaxReturn, "uploads/dana/tax-return.pdf"),
            document(DocumentKind::IdVerification, "uploads/dana/id.pdf"),
        ],
    }
}

fn document(kind: DocumentKind, reference: &str) -> DocumentIntake {
    DocumentIntake {
        kind,
        reference: reference.to_string(),
    }
}
