use lead_intel::error::AppError;
use lead_intel::evaluation::{
    EvaluationMode, InMemoryResultCache, LeadEvaluationOrchestrator, LeadRecord, LoadedConfig,
    OrchestratorConfig,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type Orchestrator = LeadEvaluationOrchestrator<InMemoryResultCache>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the orchestrator with the bundled scorers and a process-local result cache.
pub(crate) fn build_orchestrator(config_path: Option<&Path>) -> Arc<Orchestrator> {
    orchestrator_from(OrchestratorConfig::load(config_path))
}

pub(crate) fn orchestrator_from(loaded: LoadedConfig) -> Arc<Orchestrator> {
    Arc::new(LeadEvaluationOrchestrator::with_builtin_scorers(
        loaded,
        Arc::new(InMemoryResultCache::new()),
    ))
}

pub(crate) fn parse_mode(raw: &str) -> Result<EvaluationMode, String> {
    EvaluationMode::parse(raw).ok_or_else(|| {
        format!("unknown evaluation mode '{raw}' (expected real_time, batch, or quick)")
    })
}

pub(crate) fn read_lead_file(path: &Path) -> Result<LeadRecord, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_lead(&raw).map_err(|err| {
        AppError::Input(format!("failed to parse lead file {}: {err}", path.display()))
    })
}

pub(crate) fn parse_lead(raw: &str) -> Result<LeadRecord, serde_json::Error> {
    serde_json::from_str(raw)
}
