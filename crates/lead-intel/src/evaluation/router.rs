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

use super::cache::ResultCache;
use super::domain::{EvaluationContext, EvaluationMode, LeadId, LeadRecord};
use super::orchestrator::{BatchRequest, HealthStatus, LeadEvaluationOrchestrator};
use crate::error::AppError;

/// Body of a single-lead evaluation request.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub lead: LeadRecord,
    #[serde(default)]
    pub context: Option<EvaluationContext>,
    #[serde(default)]
    pub mode: Option<EvaluationMode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchEvaluateRequest {
    pub leads: Vec<BatchRequest>,
}

/// Router builder exposing the orchestrator over HTTP.
pub fn evaluation_router<C>(orchestrator: Arc<LeadEvaluationOrchestrator<C>>) -> Router
where
    C: ResultCache + 'static,
{
    Router::new()
        .route("/api/v1/leads/:lead_id/evaluate", post(evaluate_handler::<C>))
        .route("/api/v1/leads/evaluate/batch", post(batch_handler::<C>))
        .route("/api/v1/evaluations/stats", get(stats_handler::<C>))
        .route("/api/v1/evaluations/health", get(health_handler::<C>))
        .with_state(orchestrator)
}

pub(crate) async fn evaluate_handler<C>(
    State(orchestrator): State<Arc<LeadEvaluationOrchestrator<C>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    C: ResultCache + 'static,
{
    let lead_id = LeadId(lead_id);
    let mode = request.mode.unwrap_or_default();
    match orchestrator
        .evaluate_lead(&lead_id, &request.lead, request.context.as_ref(), mode)
        .await
    {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn batch_handler<C>(
    State(orchestrator): State<Arc<LeadEvaluationOrchestrator<C>>>,
    axum::Json(request): axum::Json<BatchEvaluateRequest>,
) -> Response
where
    C: ResultCache + 'static,
{
    let lead_ids: Vec<String> = request
        .leads
        .iter()
        .map(|entry| entry.lead_id.0.clone())
        .collect();
    let outcomes = orchestrator.evaluate_batch(request.leads).await;

    let results: Vec<serde_json::Value> = lead_ids
        .into_iter()
        .zip(outcomes)
        .map(|(lead_id, outcome)| match outcome {
            Ok(result) => json!({ "lead_id": lead_id, "status": "ok", "result": result }),
            Err(error) => json!({
                "lead_id": lead_id,
                "status": "error",
                "error": error.to_string(),
            }),
        })
        .collect();

    (StatusCode::OK, axum::Json(json!({ "results": results }))).into_response()
}

pub(crate) async fn stats_handler<C>(
    State(orchestrator): State<Arc<LeadEvaluationOrchestrator<C>>>,
) -> Response
where
    C: ResultCache + 'static,
{
    (StatusCode::OK, axum::Json(orchestrator.get_stats())).into_response()
}

pub(crate) async fn health_handler<C>(
    State(orchestrator): State<Arc<LeadEvaluationOrchestrator<C>>>,
) -> Response
where
    C: ResultCache + 'static,
{
    let report = orchestrator.health_check().await;
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, axum::Json(report)).into_response()
}
