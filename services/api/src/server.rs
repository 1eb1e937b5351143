use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_application_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use screenflow::config::AppConfig;
use screenflow::error::AppError;
use screenflow::telemetry;
use screenflow::workflows::application::{
    EngineConfig, MemoryRunStore, StubBackgroundCheck, StubDocumentAnalyzer, WorkflowEngine,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    // Canned providers; real document AI and screening integrations plug
    // in behind the same traits.
    let store = Arc::new(MemoryRunStore::new());
    let engine = WorkflowEngine::new(
        store,
        Arc::new(StubDocumentAnalyzer),
        Arc::new(StubBackgroundCheck::passing()),
        EngineConfig::from(&config.workflow),
    );

    let resumed = engine.recover()?;
    if resumed > 0 {
        info!(resumed, "resumed interrupted workflow runs");
    }

    let app = with_application_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "application screening orchestrator ready");

    axum::serve(listener, app).await?;
    Ok(())
}
