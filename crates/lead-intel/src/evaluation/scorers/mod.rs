//! Scorer adapter contract consumed by the aggregator.
//!
//! Each adapter is an independent capability: rule, intelligence, and predictive scorers
//! return a numeric score in `[0, 100]`, while the urgency detector returns a bundle with a
//! score in `[0, 10]` plus the signals it matched.

mod builtin;

pub use builtin::{
    ConversationIntelligenceScorer, FieldRuleScorer, KeywordUrgencyDetector,
    SourcePredictiveScorer,
};
pub(crate) use builtin::is_strong_financing;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::LeadRecord;

/// Capability implemented by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    Rule,
    Intelligence,
    Predictive,
    Urgency,
}

impl ScorerKind {
    pub const ALL: [ScorerKind; 4] = [
        ScorerKind::Rule,
        ScorerKind::Intelligence,
        ScorerKind::Predictive,
        ScorerKind::Urgency,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScorerKind::Rule => "rule",
            ScorerKind::Intelligence => "intelligence",
            ScorerKind::Predictive => "predictive",
            ScorerKind::Urgency => "urgency",
        }
    }

    /// Upper bound of the score range this capability reports on.
    pub fn max_score(&self) -> f64 {
        match self {
            ScorerKind::Urgency => 10.0,
            _ => 100.0,
        }
    }
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of an adapter call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreResult {
    Numeric { score: f64 },
    SignalBundle { score: f64, signals: Vec<String> },
}

impl ScoreResult {
    pub fn numeric(score: f64) -> Self {
        ScoreResult::Numeric { score }
    }

    pub fn score(&self) -> f64 {
        match self {
            ScoreResult::Numeric { score } | ScoreResult::SignalBundle { score, .. } => *score,
        }
    }

    pub fn signals(&self) -> &[String] {
        match self {
            ScoreResult::Numeric { .. } => &[],
            ScoreResult::SignalBundle { signals, .. } => signals,
        }
    }
}

/// Error raised by an individual adapter; always recovered inside the aggregator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScorerError {
    #[error("{kind} scorer unavailable: {reason}")]
    Unavailable { kind: ScorerKind, reason: String },
    #[error("{kind} scorer produced invalid output: {reason}")]
    InvalidOutput { kind: ScorerKind, reason: String },
}

/// Asynchronous scoring capability.
#[async_trait]
pub trait LeadScorer: Send + Sync {
    fn kind(&self) -> ScorerKind;

    fn version(&self) -> &str {
        "1.0.0"
    }

    async fn score(&self, lead: &LeadRecord) -> Result<ScoreResult, ScorerError>;

    async fn health(&self) -> bool {
        true
    }
}

/// One adapter per capability, shared across evaluations.
#[derive(Clone)]
pub struct ScorerSet {
    pub rule: Arc<dyn LeadScorer>,
    pub intelligence: Arc<dyn LeadScorer>,
    pub predictive: Arc<dyn LeadScorer>,
    pub urgency: Arc<dyn LeadScorer>,
}

impl ScorerSet {
    pub fn new(
        rule: Arc<dyn LeadScorer>,
        intelligence: Arc<dyn LeadScorer>,
        predictive: Arc<dyn LeadScorer>,
        urgency: Arc<dyn LeadScorer>,
    ) -> Self {
        Self {
            rule,
            intelligence,
            predictive,
            urgency,
        }
    }

    /// Heuristic adapters bundled with the crate.
    pub fn builtin() -> Self {
        Self::new(
            Arc::new(FieldRuleScorer),
            Arc::new(ConversationIntelligenceScorer),
            Arc::new(SourcePredictiveScorer),
            Arc::new(KeywordUrgencyDetector::default()),
        )
    }

    pub fn get(&self, kind: ScorerKind) -> &Arc<dyn LeadScorer> {
        match kind {
            ScorerKind::Rule => &self.rule,
            ScorerKind::Intelligence => &self.intelligence,
            ScorerKind::Predictive => &self.predictive,
            ScorerKind::Urgency => &self.urgency,
        }
    }
}

impl fmt::Debug for ScorerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScorerSet")
            .field("rule", &self.rule.version())
            .field("intelligence", &self.intelligence.version())
            .field("predictive", &self.predictive.version())
            .field("urgency", &self.urgency.version())
            .finish()
    }
}
