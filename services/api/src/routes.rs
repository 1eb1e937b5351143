use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use screenflow::workflows::application::{
    application_router, BackgroundCheck, DocumentAnalyzer, RunStore, WorkflowEngine,
};
use serde_json::json;
use std::sync::Arc;

/// Workflow routes plus the service endpoints every deployment carries.
pub(crate) fn with_application_routes<S, D, B>(
    engine: Arc<WorkflowEngine<S, D, B>>,
) -> axum::Router
where
    S: RunStore + 'static,
    D: DocumentAnalyzer + 'static,
    B: BackgroundCheck + 'static,
{
    application_router(engine)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
