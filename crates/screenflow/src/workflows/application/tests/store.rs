use super::common::full_intake;
use crate::workflows::application::domain::{
    ReviewDecision, ReviewRequest, ReviewStatus, ReviewToken, RunStatus, StepId, SubjectStatus,
    VerificationStatus, WorkflowRun,
};
use crate::workflows::application::store::{RunStore, StoreError};
use crate::workflows::application::MemoryRunStore;
use serde_json::json;

#[test]
fn insert_subject_assigns_identifiers_and_pending_documents() {
    let store = MemoryRunStore::new();

    let record = store.insert_subject(full_intake()).expect("insert subject");

    assert_eq!(record.status, SubjectStatus::Submitted);
    assert_eq!(record.documents.len(), 3);
    assert!(record
        .documents
        .iter()
        .all(|doc| doc.verification == VerificationStatus::Pending));

    let second = store.insert_subject(full_intake()).expect("insert subject");
    assert_ne!(record.subject_id, second.subject_id);

    let mut ids: Vec<u64> = record
        .documents
        .iter()
        .chain(second.documents.iter())
        .map(|doc| doc.document_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 6, "document ids are unique across subjects");
}

#[test]
fn record_step_never_moves_backwards() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let run = WorkflowRun::new(subject.subject_id);
    let run_id = run.run_id;
    store.insert_run(run).expect("insert run");

    store
        .record_step(&run_id, StepId::RouteDecision)
        .expect("first checkpoint");
    store
        .record_step(&run_id, StepId::ExtractDocuments)
        .expect("replayed checkpoint is accepted");

    let run = store.run(&run_id).expect("lookup").expect("run present");
    assert_eq!(run.last_completed_step, Some(StepId::RouteDecision));

    store
        .record_step(&run_id, StepId::AwaitHumanDecision)
        .expect("forward checkpoint");
    let run = store.run(&run_id).expect("lookup").expect("run present");
    assert_eq!(run.last_completed_step, Some(StepId::AwaitHumanDecision));
}

#[test]
fn duplicate_run_insert_is_a_conflict() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let run = WorkflowRun::new(subject.subject_id);
    store.insert_run(run.clone()).expect("first insert");

    match store.insert_run(run) {
        Err(StoreError::Conflict) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn active_run_skips_terminal_runs() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");

    let first = WorkflowRun::new(subject.subject_id);
    let first_id = first.run_id;
    store.insert_run(first).expect("insert run");
    store
        .set_run_status(&first_id, RunStatus::Failed)
        .expect("fail first run");

    assert!(store
        .active_run(subject.subject_id)
        .expect("query")
        .is_none());

    let second = WorkflowRun::new(subject.subject_id);
    let second_id = second.run_id;
    store.insert_run(second).expect("insert second");

    let active = store
        .active_run(subject.subject_id)
        .expect("query")
        .expect("second run is active");
    assert_eq!(active.run_id, second_id);

    let latest = store
        .latest_run(subject.subject_id)
        .expect("query")
        .expect("latest run present");
    assert_eq!(latest.run_id, second_id);
}

#[test]
fn runs_with_status_filters_for_recovery() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");

    let paused = WorkflowRun::new(subject.subject_id);
    let paused_id = paused.run_id;
    store.insert_run(paused).expect("insert");
    store
        .set_run_status(&paused_id, RunStatus::PausedForReview)
        .expect("pause");

    let other = store.insert_subject(full_intake()).expect("insert subject");
    let completed = WorkflowRun::new(other.subject_id);
    let completed_id = completed.run_id;
    store.insert_run(completed).expect("insert");
    store
        .set_run_status(&completed_id, RunStatus::Completed)
        .expect("complete");

    let paused_runs = store
        .runs_with_status(RunStatus::PausedForReview)
        .expect("query");
    assert_eq!(paused_runs.len(), 1);
    assert_eq!(paused_runs[0].run_id, paused_id);
}

#[test]
fn extraction_updates_follow_the_document_lifecycle() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let first = subject.documents[0].document_id;
    let second = subject.documents[1].document_id;
    let third = subject.documents[2].document_id;

    store
        .record_extraction(subject.subject_id, first, json!({"employer_name": "Acme"}), 0.8)
        .expect("record extraction");
    store
        .record_extraction(subject.subject_id, second, json!({"annual_income": 60000}), 0.9)
        .expect("record extraction");
    store
        .mark_extraction_failed(subject.subject_id, third)
        .expect("mark failed");

    let verified = store
        .verify_extracted_documents(subject.subject_id)
        .expect("verify");
    assert_eq!(verified, 2, "only extracted documents flip to verified");

    let record = store
        .subject(subject.subject_id)
        .expect("lookup")
        .expect("record present");
    assert_eq!(
        record.documents[0].verification,
        VerificationStatus::Verified
    );
    assert_eq!(
        record.documents[1].verification,
        VerificationStatus::Verified
    );
    assert_eq!(record.documents[2].verification, VerificationStatus::Failed);

    let verified_again = store
        .verify_extracted_documents(subject.subject_id)
        .expect("verify twice");
    assert_eq!(verified_again, 0, "verification is not repeated");
}

#[test]
fn record_extraction_for_unknown_document_is_not_found() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");

    match store.record_extraction(subject.subject_id, 9999, json!({}), 0.5) {
        Err(StoreError::NotFound) => {}
        other => panic!("expected not-found, got {other:?}"),
    }
}

#[test]
fn a_second_pending_review_for_the_same_token_is_refused() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let run = WorkflowRun::new(subject.subject_id);
    let token = ReviewToken::for_subject(subject.subject_id);
    store.insert_run(run.clone()).expect("insert run");

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            run.run_id,
        ))
        .expect("first pending request");

    match store.insert_review_request(ReviewRequest::pending(
        token.clone(),
        subject.subject_id,
        run.run_id,
    )) {
        Err(StoreError::Conflict) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn a_completed_review_is_replaced_by_a_new_pending_request() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let token = ReviewToken::for_subject(subject.subject_id);
    let first_run = WorkflowRun::new(subject.subject_id);
    let second_run = WorkflowRun::new(subject.subject_id);

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            first_run.run_id,
        ))
        .expect("first request");
    store
        .complete_review_request(&token, ReviewDecision::Approved, None)
        .expect("complete first");

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            second_run.run_id,
        ))
        .expect("completed request is replaced");

    let request = store
        .review_request(&token)
        .expect("lookup")
        .expect("request present");
    assert_eq!(request.status, ReviewStatus::Pending);
    assert_eq!(request.run_id, second_run.run_id);
}

#[test]
fn completing_a_review_twice_is_a_conflict() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let run = WorkflowRun::new(subject.subject_id);
    let token = ReviewToken::for_subject(subject.subject_id);

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            run.run_id,
        ))
        .expect("pending request");
    store
        .complete_review_request(&token, ReviewDecision::Rejected, Some("forged stub".to_string()))
        .expect("first completion");

    match store.complete_review_request(&token, ReviewDecision::Approved, None) {
        Err(StoreError::Conflict) => {}
        other => panic!("expected conflict, got {other:?}"),
    }

    let request = store
        .review_request(&token)
        .expect("lookup")
        .expect("request present");
    assert_eq!(request.decision, Some(ReviewDecision::Rejected));
    assert_eq!(request.reason.as_deref(), Some("forged stub"));
    assert!(request.decided_at.is_some());
}

#[test]
fn discard_pending_review_leaves_completed_requests_alone() {
    let store = MemoryRunStore::new();
    let subject = store.insert_subject(full_intake()).expect("insert subject");
    let run = WorkflowRun::new(subject.subject_id);
    let token = ReviewToken::for_subject(subject.subject_id);

    assert!(!store
        .discard_pending_review(&token)
        .expect("discard on empty store"));

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            run.run_id,
        ))
        .expect("pending request");
    assert!(store.discard_pending_review(&token).expect("discard pending"));
    assert!(store.review_request(&token).expect("lookup").is_none());

    store
        .insert_review_request(ReviewRequest::pending(
            token.clone(),
            subject.subject_id,
            run.run_id,
        ))
        .expect("fresh pending request");
    store
        .complete_review_request(&token, ReviewDecision::Approved, None)
        .expect("complete");
    assert!(!store
        .discard_pending_review(&token)
        .expect("completed request survives"));
    assert!(store.review_request(&token).expect("lookup").is_some());
}
