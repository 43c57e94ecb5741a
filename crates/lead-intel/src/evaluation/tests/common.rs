use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::evaluation::cache::{CacheError, InMemoryResultCache, ResultCache};
use crate::evaluation::config::{ConfigSource, LoadedConfig, ModeSettings, OrchestratorConfig};
use crate::evaluation::domain::{ConversationTurn, EvaluationMode, LeadRecord};
use crate::evaluation::orchestrator::LeadEvaluationOrchestrator;
use crate::evaluation::scorers::{LeadScorer, ScoreResult, ScorerError, ScorerKind, ScorerSet};

/// Returns a canned result, optionally after a delay.
pub(super) struct FixedScorer {
    pub kind: ScorerKind,
    pub result: ScoreResult,
    pub delay: Duration,
}

#[async_trait]
impl LeadScorer for FixedScorer {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    fn version(&self) -> &str {
        "test-fixed"
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.result.clone())
    }
}

pub(super) struct FailingScorer {
    pub kind: ScorerKind,
}

#[async_trait]
impl LeadScorer for FailingScorer {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        Err(ScorerError::Unavailable {
            kind: self.kind,
            reason: "model endpoint refused connection".to_string(),
        })
    }

    async fn health(&self) -> bool {
        false
    }
}

pub(super) struct HangingScorer {
    pub kind: ScorerKind,
}

#[async_trait]
impl LeadScorer for HangingScorer {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Ok(ScoreResult::numeric(100.0))
    }
}

/// Scores normally but never answers a health probe.
pub(super) struct UnresponsiveHealthScorer {
    pub kind: ScorerKind,
}

#[async_trait]
impl LeadScorer for UnresponsiveHealthScorer {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        Ok(ScoreResult::numeric(50.0))
    }

    async fn health(&self) -> bool {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        true
    }
}

/// Cache whose backing store is down.
#[derive(Debug, Default)]
pub(super) struct UnavailableCache;

#[async_trait]
impl ResultCache for UnavailableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub(super) fn fixed(kind: ScorerKind, score: f64) -> Arc<dyn LeadScorer> {
    Arc::new(FixedScorer {
        kind,
        result: ScoreResult::numeric(score),
        delay: Duration::ZERO,
    })
}

pub(super) fn fixed_urgency(score: f64, signals: &[&str]) -> Arc<dyn LeadScorer> {
    Arc::new(FixedScorer {
        kind: ScorerKind::Urgency,
        result: ScoreResult::SignalBundle {
            score,
            signals: signals.iter().map(|signal| signal.to_string()).collect(),
        },
        delay: Duration::ZERO,
    })
}

pub(super) fn failing(kind: ScorerKind) -> Arc<dyn LeadScorer> {
    Arc::new(FailingScorer { kind })
}

pub(super) fn hanging(kind: ScorerKind) -> Arc<dyn LeadScorer> {
    Arc::new(HangingScorer { kind })
}

/// rule 80, intelligence 60, predictive 40, urgency 5 with one signal.
pub(super) fn fixed_scorers() -> ScorerSet {
    ScorerSet::new(
        fixed(ScorerKind::Rule, 80.0),
        fixed(ScorerKind::Intelligence, 60.0),
        fixed(ScorerKind::Predictive, 40.0),
        fixed_urgency(5.0, &["immediate:this week"]),
    )
}

pub(super) fn hanging_scorers() -> ScorerSet {
    ScorerSet::new(
        hanging(ScorerKind::Rule),
        hanging(ScorerKind::Intelligence),
        hanging(ScorerKind::Predictive),
        hanging(ScorerKind::Urgency),
    )
}

pub(super) fn failing_scorers() -> ScorerSet {
    ScorerSet::new(
        failing(ScorerKind::Rule),
        failing(ScorerKind::Intelligence),
        failing(ScorerKind::Predictive),
        failing(ScorerKind::Urgency),
    )
}

pub(super) fn standard_config() -> LoadedConfig {
    LoadedConfig {
        config: OrchestratorConfig::standard(),
        source: ConfigSource::Document,
    }
}

pub(super) fn real_time() -> ModeSettings {
    OrchestratorConfig::standard().mode(EvaluationMode::RealTime)
}

pub(super) fn builtin_orchestrator() -> LeadEvaluationOrchestrator<InMemoryResultCache> {
    LeadEvaluationOrchestrator::with_builtin_scorers(
        standard_config(),
        Arc::new(InMemoryResultCache::new()),
    )
}

pub(super) fn orchestrator_with(
    scorers: ScorerSet,
) -> LeadEvaluationOrchestrator<InMemoryResultCache> {
    LeadEvaluationOrchestrator::new(
        standard_config(),
        scorers,
        Arc::new(InMemoryResultCache::new()),
    )
}

/// The six required fields, complete.
pub(super) fn required_only_lead() -> LeadRecord {
    LeadRecord::default()
        .with_field("budget", json!("$450,000 - $500,000"))
        .with_field("financing_status", json!("Pre-approved with Lakeside Credit Union"))
        .with_field("purchase_timeline", json!("within 30 days"))
        .with_field("property_type", json!("single family"))
        .with_field("location_preference", json!("Austin, Round Rock"))
        .with_field("motivation", json!("relocating for a new job"))
}

/// Every configured field complete plus an urgent conversation.
pub(super) fn complete_lead() -> LeadRecord {
    required_only_lead()
        .with_field("bedrooms", json!(4))
        .with_field("family_size", json!(5))
        .with_field("move_in_date", json!("2026-11-15"))
        .with_field("down_payment", json!("20 percent"))
        .with_field("bathrooms", json!(3))
        .with_field("current_situation", json!("renting, lease ends next month"))
        .with_field("decision_makers", json!("me and my spouse"))
        .with_field("source", json!("referral"))
        .with_turn(ConversationTurn::agent(
            "Thanks for reaching out! What are you looking for?",
            Utc::now(),
        ))
        .with_turn(ConversationTurn::prospect(
            "We are ready to move this week if we find the right 4 bedroom place. Can we see homes Saturday?",
            Utc::now(),
        ))
}

pub(super) async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
