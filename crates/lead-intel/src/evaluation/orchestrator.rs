//! Public entry point: cache check, scoring fan-out, qualification, assistance, and assembly.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::aggregator::{AggregationError, ScoringAggregator, ScoringBreakdown};
use super::assistance::{AgentAssistanceData, AssistanceGenerator, RecommendedAction};
use super::cache::{cache_key, ResultCache};
use super::config::{ConfigSource, LoadedConfig, OrchestratorConfig};
use super::domain::{
    round2, ConversationTurn, EvaluationContext, EvaluationId, EvaluationMode, LeadId, LeadRecord,
};
use super::metrics::{EvaluationStats, OrchestratorMetrics};
use super::qualification::{QualificationField, QualificationProgress, QualificationTracker};
use super::scorers::{KeywordUrgencyDetector, ScorerKind, ScorerSet};

pub const ORCHESTRATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

const FRESH_DAYS: f64 = 1.0;
const STALE_DAYS: f64 = 30.0;
const STALE_FRESHNESS: f64 = 0.2;
const NO_HISTORY_FRESHNESS: f64 = 0.5;
const HEALTH_PROBE_TIMEOUT_MS: u64 = 1_000;

/// Failures visible to callers of [`LeadEvaluationOrchestrator::evaluate_lead`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvaluationError {
    #[error("{mode} evaluation timed out after {timeout_ms}ms")]
    Timeout { mode: EvaluationMode, timeout_ms: u64 },
    #[error("invalid lead: {0}")]
    InvalidLead(String),
    #[error("evaluation failed: {0}")]
    Internal(String),
}

impl EvaluationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EvaluationError::Timeout { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationDiagnostics {
    pub duration_ms: f64,
    pub cache_hit: bool,
    pub config_source: ConfigSource,
    pub component_versions: BTreeMap<String, String>,
    pub confidence_score: f64,
    pub data_freshness_score: f64,
    pub data_quality_score: f64,
}

/// Aggregate root returned to callers and stored in the result cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadEvaluationResult {
    pub lead_id: LeadId,
    pub evaluation_id: EvaluationId,
    pub evaluated_at: DateTime<Utc>,
    pub evaluation_mode: EvaluationMode,
    pub scoring_breakdown: ScoringBreakdown,
    pub qualification_progress: QualificationProgress,
    pub qualification_fields: BTreeMap<String, QualificationField>,
    pub agent_assistance: AgentAssistanceData,
    pub recommended_actions: Vec<RecommendedAction>,
    pub diagnostics: EvaluationDiagnostics,
}

/// One lead in a batch submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub lead_id: LeadId,
    pub lead: LeadRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub adapters: BTreeMap<ScorerKind, bool>,
    pub cache_reachable: bool,
    pub config_loaded: bool,
    pub checked_at: DateTime<Utc>,
}

/// Coordinates one evaluation per call. Shared across requests behind an `Arc`.
pub struct LeadEvaluationOrchestrator<C> {
    config: OrchestratorConfig,
    config_source: ConfigSource,
    aggregator: ScoringAggregator,
    tracker: QualificationTracker,
    assistance: AssistanceGenerator,
    cache: Arc<C>,
    metrics: OrchestratorMetrics,
}

impl<C> LeadEvaluationOrchestrator<C>
where
    C: ResultCache + 'static,
{
    pub fn new(loaded: LoadedConfig, scorers: ScorerSet, cache: Arc<C>) -> Self {
        let LoadedConfig { config, source } = loaded;
        let aggregator = ScoringAggregator::new(
            scorers,
            config.scoring_weights.clone(),
            config.critical_fields.clone(),
        );
        let tracker = QualificationTracker::new(config.critical_fields.clone());
        let assistance = AssistanceGenerator::from_config(&config);

        Self {
            config,
            config_source: source,
            aggregator,
            tracker,
            assistance,
            cache,
            metrics: OrchestratorMetrics::new(),
        }
    }

    /// Uses the bundled heuristic scorers; the urgency detector follows the configured families.
    pub fn with_builtin_scorers(loaded: LoadedConfig, cache: Arc<C>) -> Self {
        let mut scorers = ScorerSet::builtin();
        scorers.urgency = Arc::new(KeywordUrgencyDetector::new(
            loaded.config.urgency_patterns.clone(),
        ));
        Self::new(loaded, scorers, cache)
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn config_source(&self) -> ConfigSource {
        self.config_source
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub async fn evaluate_lead(
        &self,
        lead_id: &LeadId,
        lead: &LeadRecord,
        context: Option<&EvaluationContext>,
        mode: EvaluationMode,
    ) -> Result<LeadEvaluationResult, EvaluationError> {
        let started = Instant::now();
        match self.run(lead_id, lead, context, mode, started).await {
            Ok(result) => {
                self.metrics.record_evaluation(elapsed_ms(started));
                Ok(result)
            }
            Err(err) => {
                self.metrics.record_error(err.is_timeout());
                error!(lead_id = %lead_id, mode = %mode, error = %err, "lead evaluation failed");
                Err(err)
            }
        }
    }

    /// Evaluates every request concurrently in batch mode; results keep input order.
    pub async fn evaluate_batch(
        &self,
        requests: Vec<BatchRequest>,
    ) -> Vec<Result<LeadEvaluationResult, EvaluationError>> {
        let batch_id = EvaluationId::generate().0;
        info!(batch_id = %batch_id, size = requests.len(), "batch evaluation started");

        let contexts: Vec<EvaluationContext> = (0..requests.len())
            .map(|position| EvaluationContext::Batch {
                batch_id: batch_id.clone(),
                position,
            })
            .collect();

        join_all(requests.iter().zip(contexts.iter()).map(|(request, context)| {
            self.evaluate_lead(
                &request.lead_id,
                &request.lead,
                Some(context),
                EvaluationMode::Batch,
            )
        }))
        .await
    }

    pub fn get_stats(&self) -> EvaluationStats {
        self.metrics.snapshot()
    }

    pub async fn health_check(&self) -> HealthReport {
        let probe_timeout = Duration::from_millis(HEALTH_PROBE_TIMEOUT_MS);
        let mut adapters = BTreeMap::new();
        for kind in ScorerKind::ALL {
            let scorer = self.aggregator.scorers().get(kind);
            let healthy = match tokio::time::timeout(probe_timeout, scorer.health()).await {
                Ok(healthy) => healthy,
                Err(_) => {
                    warn!(
                        component = %kind,
                        timeout_ms = HEALTH_PROBE_TIMEOUT_MS,
                        "adapter health probe timed out"
                    );
                    false
                }
            };
            adapters.insert(kind, healthy);
        }
        let cache_reachable = match self.cache.ping().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "result cache ping failed");
                false
            }
        };
        let config_loaded = self.config_source == ConfigSource::Document;

        let status = if adapters.values().all(|healthy| !healthy) {
            HealthStatus::Unhealthy
        } else if adapters.values().all(|healthy| *healthy) && cache_reachable && config_loaded {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthReport {
            status,
            adapters,
            cache_reachable,
            config_loaded,
            checked_at: Utc::now(),
        }
    }

    async fn run(
        &self,
        lead_id: &LeadId,
        lead: &LeadRecord,
        context: Option<&EvaluationContext>,
        mode: EvaluationMode,
        started: Instant,
    ) -> Result<LeadEvaluationResult, EvaluationError> {
        if lead_id.as_str().trim().is_empty() {
            return Err(EvaluationError::InvalidLead(
                "lead id must not be blank".to_string(),
            ));
        }

        let settings = self.config.mode(mode);
        let live_turns = context.map(EvaluationContext::live_turns).unwrap_or_default();
        let key = match cache_key(lead_id, lead, live_turns, &settings.scorers) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(lead_id = %lead_id, error = %err, "cache key unavailable; skipping cache");
                None
            }
        };

        if settings.read_cache {
            if let Some(key) = key.as_deref() {
                if let Some(mut cached) = self.read_cached(key).await {
                    self.metrics.record_cache_hit();
                    cached.evaluation_mode = mode;
                    cached.agent_assistance.agent_id =
                        context.and_then(EvaluationContext::agent_id).map(str::to_string);
                    cached.diagnostics.cache_hit = true;
                    cached.diagnostics.duration_ms = elapsed_ms(started);
                    debug!(lead_id = %lead_id, mode = %mode, "served evaluation from cache");
                    return Ok(cached);
                }
            }
            self.metrics.record_cache_miss();
        }

        let merged = merge_live_turns(lead, live_turns);

        let breakdown = self
            .aggregator
            .aggregate(&merged, &settings)
            .await
            .map_err(|err| match err {
                AggregationError::Timeout { timeout_ms } => {
                    EvaluationError::Timeout { mode, timeout_ms }
                }
            })?;
        if !breakdown.composite_score.is_finite() {
            return Err(EvaluationError::Internal(
                "composite score is not a finite number".to_string(),
            ));
        }

        let (progress, fields) = self.tracker.track(&merged);
        let assistance = self
            .assistance
            .generate(&merged, &breakdown, &progress, &fields, context);

        let diagnostics = EvaluationDiagnostics {
            duration_ms: elapsed_ms(started),
            cache_hit: false,
            config_source: self.config_source,
            component_versions: self.component_versions(),
            confidence_score: round2(1.0 - breakdown.confidence_interval.width() / 100.0),
            data_freshness_score: freshness_score(merged.latest_turn_at(), Utc::now()),
            data_quality_score: round2(
                (breakdown.data_completeness + breakdown.adapter_success_ratio()) / 2.0,
            ),
        };

        let result = LeadEvaluationResult {
            lead_id: lead_id.clone(),
            evaluation_id: EvaluationId::generate(),
            evaluated_at: Utc::now(),
            evaluation_mode: mode,
            recommended_actions: assistance.recommended_actions.clone(),
            scoring_breakdown: breakdown,
            qualification_progress: progress,
            qualification_fields: fields,
            agent_assistance: assistance,
            diagnostics,
        };

        if settings.write_cache {
            if let Some(key) = key.as_deref() {
                self.write_cached(key, &result).await;
            }
        }

        info!(
            lead_id = %lead_id,
            mode = %mode,
            composite_score = result.scoring_breakdown.composite_score,
            tier = result.qualification_progress.tier.label(),
            elapsed_ms = result.diagnostics.duration_ms,
            "lead evaluated"
        );
        Ok(result)
    }

    /// Cache failures and undecodable entries read as misses.
    async fn read_cached(&self, key: &str) -> Option<LeadEvaluationResult> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!(error = %err, "result cache read failed; recomputing");
                return None;
            }
        };
        match serde_json::from_str::<LeadEvaluationResult>(&raw) {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(error = %err, "cached evaluation could not be decoded; recomputing");
                None
            }
        }
    }

    async fn write_cached(&self, key: &str, result: &LeadEvaluationResult) {
        let encoded = match serde_json::to_string(result) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "evaluation could not be encoded for caching");
                return;
            }
        };
        if let Err(err) = self.cache.set(key, encoded, self.config.cache_ttl).await {
            warn!(error = %err, "result cache write failed; continuing without cache");
        }
    }

    fn component_versions(&self) -> BTreeMap<String, String> {
        let mut versions: BTreeMap<String, String> = ScorerKind::ALL
            .iter()
            .map(|kind| {
                let version = self.aggregator.scorers().get(*kind).version().to_string();
                (kind.label().to_string(), version)
            })
            .collect();
        versions.insert("orchestrator".to_string(), ORCHESTRATOR_VERSION.to_string());
        versions
    }
}

fn merge_live_turns<'a>(
    lead: &'a LeadRecord,
    live_turns: &[ConversationTurn],
) -> Cow<'a, LeadRecord> {
    if live_turns.is_empty() {
        return Cow::Borrowed(lead);
    }
    let mut merged = lead.clone();
    merged.conversation.extend(live_turns.iter().cloned());
    Cow::Owned(merged)
}

fn elapsed_ms(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64() * 1_000.0)
}

/// 1.0 up to a day old, linear decay to 0.2 at thirty days, 0.5 without any turns.
pub fn freshness_score(latest_turn: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(latest) = latest_turn else {
        return NO_HISTORY_FRESHNESS;
    };
    let age_days = (now - latest).num_seconds().max(0) as f64 / 86_400.0;
    if age_days <= FRESH_DAYS {
        1.0
    } else if age_days >= STALE_DAYS {
        STALE_FRESHNESS
    } else {
        let decay = (age_days - FRESH_DAYS) / (STALE_DAYS - FRESH_DAYS);
        round2(1.0 - (1.0 - STALE_FRESHNESS) * decay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn freshness_decays_with_age() {
        let now = Utc::now();
        assert_eq!(freshness_score(None, now), NO_HISTORY_FRESHNESS);
        assert_eq!(freshness_score(Some(now - Duration::hours(3)), now), 1.0);
        assert_eq!(freshness_score(Some(now - Duration::days(45)), now), STALE_FRESHNESS);

        let midway = freshness_score(Some(now - Duration::days(15)), now);
        assert!(midway < 1.0 && midway > STALE_FRESHNESS);
    }
}
