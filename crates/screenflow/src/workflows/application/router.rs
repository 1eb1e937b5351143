use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ReviewDecision, ReviewToken, SubjectId, SubjectIntake};
use super::engine::{EngineError, WorkflowEngine};
use super::providers::{BackgroundCheck, DocumentAnalyzer};
use super::store::RunStore;

/// Body for the decision endpoint. `reason` is free text kept on the review
/// request for audit.
#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Router builder exposing the workflow lifecycle over HTTP.
pub fn application_router<S, D, B>(engine: Arc<WorkflowEngine<S, D, B>>) -> Router
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<S, D, B>))
        .route(
            "/api/v1/applications/:subject_id/workflow",
            get(status_handler::<S, D, B>),
        )
        .route(
            "/api/v1/applications/:subject_id/decision",
            post(decision_handler::<S, D, B>),
        )
        .route(
            "/api/v1/applications/:subject_id/retry",
            post(retry_handler::<S, D, B>),
        )
        .route(
            "/api/v1/applications/:subject_id/cancel",
            post(cancel_handler::<S, D, B>),
        )
        .with_state(engine)
}

pub(crate) async fn submit_handler<S, D, B>(
    State(engine): State<Arc<WorkflowEngine<S, D, B>>>,
    axum::Json(intake): axum::Json<SubjectIntake>,
) -> Response
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    match engine.submit(intake) {
        Ok(handle) => {
            let payload = json!({
                "subject_id": handle.subject_id,
                "run_id": handle.run_id,
                "status": "accepted",
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

pub(crate) async fn status_handler<S, D, B>(
    State(engine): State<Arc<WorkflowEngine<S, D, B>>>,
    Path(subject_id): Path<u64>,
) -> Response
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    match engine.run_status(SubjectId(subject_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => engine_error_response(err),
    }
}

pub(crate) async fn decision_handler<S, D, B>(
    State(engine): State<Arc<WorkflowEngine<S, D, B>>>,
    Path(subject_id): Path<u64>,
    axum::Json(body): axum::Json<DecisionBody>,
) -> Response
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    let token = ReviewToken::for_subject(SubjectId(subject_id));
    match engine.deliver_review_decision(&token, body.decision, body.reason) {
        Ok(()) => {
            let payload = json!({
                "subject_id": subject_id,
                "decision": body.decision.label(),
                "status": "delivered",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

pub(crate) async fn retry_handler<S, D, B>(
    State(engine): State<Arc<WorkflowEngine<S, D, B>>>,
    Path(subject_id): Path<u64>,
) -> Response
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    match engine.retry(SubjectId(subject_id)) {
        Ok(run_id) => {
            let payload = json!({
                "subject_id": subject_id,
                "run_id": run_id,
                "status": "retrying",
            });
            (StatusCode::ACCEPTED, axum::Json(payload)).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

pub(crate) async fn cancel_handler<S, D, B>(
    State(engine): State<Arc<WorkflowEngine<S, D, B>>>,
    Path(subject_id): Path<u64>,
) -> Response
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    match engine.cancel(SubjectId(subject_id)) {
        Ok(run_id) => {
            let payload = json!({
                "subject_id": subject_id,
                "run_id": run_id,
                "status": "cancelled",
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => engine_error_response(err),
    }
}

fn engine_error_response(err: EngineError) -> Response {
    let status = match &err {
        EngineError::SubjectNotFound(_) | EngineError::RunNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidState(_) => StatusCode::BAD_REQUEST,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
