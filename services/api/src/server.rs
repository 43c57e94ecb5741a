use crate::cli::ServeArgs;
use crate::infra::{orchestrator_from, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lead_intel::config::AppConfig;
use lead_intel::error::AppError;
use lead_intel::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = orchestrator_from(config.evaluation.load_orchestrator_config());
    let config_source = orchestrator.config_source();
    let cache_purger = orchestrator
        .cache()
        .spawn_purge_task(orchestrator.config().cache_ttl);

    let app = with_service_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, ?config_source, %addr, "lead evaluation orchestrator ready");

    let served = axum::serve(listener, app).await;
    cache_purger.abort();
    served?;
    Ok(())
}
