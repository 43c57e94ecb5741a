//! Concurrent scorer fan-out and weighted composite scoring.

mod components;

pub use components::NEUTRAL_COMMUNICATION;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{CriticalFieldSpec, ModeSettings, ScoringWeights};
use super::domain::{round2, LeadRecord};
use super::qualification::{assess_fields, required_completion_percentage, weighted_completion};
use super::scorers::{ScoreResult, ScorerKind, ScorerSet};

const MIN_INTERVAL_HALF_WIDTH: f64 = 5.0;
const INTERVAL_SPREAD: f64 = 20.0;

/// The nine weighted inputs of the composite score, in summation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    RuleScore,
    IntelligenceScore,
    PredictiveScore,
    BudgetAlignment,
    LocationPreference,
    TimelineUrgency,
    EngagementLevel,
    CommunicationQuality,
    QualificationCompleteness,
}

impl ScoreComponent {
    pub const ALL: [ScoreComponent; 9] = [
        ScoreComponent::RuleScore,
        ScoreComponent::IntelligenceScore,
        ScoreComponent::PredictiveScore,
        ScoreComponent::BudgetAlignment,
        ScoreComponent::LocationPreference,
        ScoreComponent::TimelineUrgency,
        ScoreComponent::EngagementLevel,
        ScoreComponent::CommunicationQuality,
        ScoreComponent::QualificationCompleteness,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScoreComponent::RuleScore => "rule_score",
            ScoreComponent::IntelligenceScore => "intelligence_score",
            ScoreComponent::PredictiveScore => "predictive_score",
            ScoreComponent::BudgetAlignment => "budget_alignment",
            ScoreComponent::LocationPreference => "location_preference",
            ScoreComponent::TimelineUrgency => "timeline_urgency",
            ScoreComponent::EngagementLevel => "engagement_level",
            ScoreComponent::CommunicationQuality => "communication_quality",
            ScoreComponent::QualificationCompleteness => "qualification_completeness",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|component| component.label() == raw)
    }

    /// Adapter whose output feeds this component, if any.
    pub fn source_scorer(&self) -> Option<ScorerKind> {
        match self {
            ScoreComponent::RuleScore => Some(ScorerKind::Rule),
            ScoreComponent::IntelligenceScore => Some(ScorerKind::Intelligence),
            ScoreComponent::PredictiveScore => Some(ScorerKind::Predictive),
            ScoreComponent::TimelineUrgency => Some(ScorerKind::Urgency),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to one adapter during the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterOutcome {
    Ok,
    Failed { reason: String },
    Skipped,
}

impl AdapterOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AdapterOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Aggregated scoring output. One instance per evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub rule_score: f64,
    pub intelligence_score: f64,
    pub predictive_score: f64,
    pub budget_alignment: f64,
    pub location_preference: f64,
    pub timeline_urgency: f64,
    pub engagement_level: f64,
    pub communication_quality: f64,
    pub qualification_completeness: f64,
    pub composite_score: f64,
    pub confidence_interval: ConfidenceInterval,
    pub data_completeness: f64,
    pub urgency_signals: Vec<String>,
    pub adapter_outcomes: BTreeMap<ScorerKind, AdapterOutcome>,
    pub effective_weights: BTreeMap<ScoreComponent, f64>,
    pub computed_at: DateTime<Utc>,
}

impl ScoringBreakdown {
    pub fn component(&self, component: ScoreComponent) -> f64 {
        match component {
            ScoreComponent::RuleScore => self.rule_score,
            ScoreComponent::IntelligenceScore => self.intelligence_score,
            ScoreComponent::PredictiveScore => self.predictive_score,
            ScoreComponent::BudgetAlignment => self.budget_alignment,
            ScoreComponent::LocationPreference => self.location_preference,
            ScoreComponent::TimelineUrgency => self.timeline_urgency,
            ScoreComponent::EngagementLevel => self.engagement_level,
            ScoreComponent::CommunicationQuality => self.communication_quality,
            ScoreComponent::QualificationCompleteness => self.qualification_completeness,
        }
    }

    /// Share of executed adapters that returned a usable result.
    pub fn adapter_success_ratio(&self) -> f64 {
        let executed: Vec<_> = self
            .adapter_outcomes
            .values()
            .filter(|outcome| !matches!(outcome, AdapterOutcome::Skipped))
            .collect();
        if executed.is_empty() {
            return 1.0;
        }
        let ok = executed
            .iter()
            .filter(|outcome| matches!(outcome, AdapterOutcome::Ok))
            .count();
        ok as f64 / executed.len() as f64
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AggregationError {
    #[error("scorer fan-out exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

struct AdapterCall {
    outcome: AdapterOutcome,
    result: Option<ScoreResult>,
}

impl AdapterCall {
    fn score(&self) -> f64 {
        self.result.as_ref().map(ScoreResult::score).unwrap_or(0.0)
    }
}

/// Runs the scorer adapters concurrently and folds their output into one breakdown.
#[derive(Debug, Clone)]
pub struct ScoringAggregator {
    scorers: ScorerSet,
    weights: ScoringWeights,
    fields: Vec<CriticalFieldSpec>,
}

impl ScoringAggregator {
    pub fn new(
        scorers: ScorerSet,
        weights: ScoringWeights,
        fields: Vec<CriticalFieldSpec>,
    ) -> Self {
        Self {
            scorers,
            weights,
            fields,
        }
    }

    pub fn scorers(&self) -> &ScorerSet {
        &self.scorers
    }

    pub async fn aggregate(
        &self,
        lead: &LeadRecord,
        settings: &ModeSettings,
    ) -> Result<ScoringBreakdown, AggregationError> {
        let fan_out = async {
            tokio::join!(
                self.invoke(ScorerKind::Rule, lead, settings),
                self.invoke(ScorerKind::Intelligence, lead, settings),
                self.invoke(ScorerKind::Predictive, lead, settings),
                self.invoke(ScorerKind::Urgency, lead, settings),
            )
        };

        let (rule, intelligence, predictive, urgency) =
            tokio::time::timeout(settings.timeout(), fan_out)
                .await
                .map_err(|_| AggregationError::Timeout {
                    timeout_ms: settings.timeout_ms,
                })?;

        Ok(self.combine(lead, settings, rule, intelligence, predictive, urgency))
    }

    async fn invoke(
        &self,
        kind: ScorerKind,
        lead: &LeadRecord,
        settings: &ModeSettings,
    ) -> AdapterCall {
        if !settings.runs(kind) {
            return AdapterCall {
                outcome: AdapterOutcome::Skipped,
                result: None,
            };
        }

        let scorer = self.scorers.get(kind);
        let validated = scorer
            .score(lead)
            .await
            .map_err(|err| err.to_string())
            .and_then(|result| validate(kind, result));

        match validated {
            Ok(result) => AdapterCall {
                outcome: AdapterOutcome::Ok,
                result: Some(result),
            },
            Err(reason) => {
                warn!(
                    component = %kind,
                    version = scorer.version(),
                    %reason,
                    "scorer adapter failed; contributing zero"
                );
                AdapterCall {
                    outcome: AdapterOutcome::Failed { reason },
                    result: None,
                }
            }
        }
    }

    fn combine(
        &self,
        lead: &LeadRecord,
        settings: &ModeSettings,
        rule: AdapterCall,
        intelligence: AdapterCall,
        predictive: AdapterCall,
        urgency: AdapterCall,
    ) -> ScoringBreakdown {
        let fields = assess_fields(lead, &self.fields);

        let mut scores: BTreeMap<ScoreComponent, f64> = BTreeMap::new();
        scores.insert(ScoreComponent::RuleScore, rule.score());
        scores.insert(ScoreComponent::IntelligenceScore, intelligence.score());
        scores.insert(ScoreComponent::PredictiveScore, predictive.score());
        scores.insert(ScoreComponent::BudgetAlignment, components::budget_alignment(lead));
        scores.insert(
            ScoreComponent::LocationPreference,
            components::location_preference(lead),
        );
        scores.insert(
            ScoreComponent::TimelineUrgency,
            components::timeline_urgency(urgency.score()),
        );
        scores.insert(ScoreComponent::EngagementLevel, components::engagement_level(lead));
        scores.insert(
            ScoreComponent::CommunicationQuality,
            components::communication_quality(lead),
        );
        scores.insert(
            ScoreComponent::QualificationCompleteness,
            required_completion_percentage(&fields),
        );
        for score in scores.values_mut() {
            *score = round2(*score);
        }

        let weights = if ScorerKind::ALL.iter().all(|kind| settings.runs(*kind)) {
            self.weights.clone()
        } else {
            self.weights.redistribute(|component| {
                component
                    .source_scorer()
                    .map_or(true, |kind| settings.runs(kind))
            })
        };

        let weighted_sum: f64 = ScoreComponent::ALL
            .iter()
            .map(|component| scores[component] * weights.weight(*component))
            .sum();
        let composite_score = round2(weighted_sum.clamp(0.0, 100.0));

        let has_conversation = lead.prospect_turns().next().is_some();
        let data_completeness =
            (weighted_completion(&fields) + if has_conversation { 1.0 } else { 0.0 }) / 2.0;
        let confidence_interval = confidence_interval(composite_score, data_completeness);

        debug!(composite_score, data_completeness, "scoring breakdown assembled");

        let urgency_signals = urgency
            .result
            .as_ref()
            .map(|result| result.signals().to_vec())
            .unwrap_or_default();

        let mut adapter_outcomes = BTreeMap::new();
        adapter_outcomes.insert(ScorerKind::Rule, rule.outcome);
        adapter_outcomes.insert(ScorerKind::Intelligence, intelligence.outcome);
        adapter_outcomes.insert(ScorerKind::Predictive, predictive.outcome);
        adapter_outcomes.insert(ScorerKind::Urgency, urgency.outcome);

        ScoringBreakdown {
            rule_score: scores[&ScoreComponent::RuleScore],
            intelligence_score: scores[&ScoreComponent::IntelligenceScore],
            predictive_score: scores[&ScoreComponent::PredictiveScore],
            budget_alignment: scores[&ScoreComponent::BudgetAlignment],
            location_preference: scores[&ScoreComponent::LocationPreference],
            timeline_urgency: scores[&ScoreComponent::TimelineUrgency],
            engagement_level: scores[&ScoreComponent::EngagementLevel],
            communication_quality: scores[&ScoreComponent::CommunicationQuality],
            qualification_completeness: scores[&ScoreComponent::QualificationCompleteness],
            composite_score,
            confidence_interval,
            data_completeness: round2(data_completeness),
            urgency_signals,
            adapter_outcomes,
            effective_weights: weights
                .iter()
                .map(|(component, weight)| (component, (weight * 10_000.0).round() / 10_000.0))
                .collect(),
            computed_at: Utc::now(),
        }
    }
}

/// Clamps adapter output into its capability range; rejects non-finite values.
fn validate(kind: ScorerKind, result: ScoreResult) -> Result<ScoreResult, String> {
    let score = result.score();
    if !score.is_finite() {
        return Err(format!("non-finite score {score}"));
    }
    let bounded = score.clamp(0.0, kind.max_score());
    Ok(match result {
        ScoreResult::Numeric { .. } => ScoreResult::Numeric { score: bounded },
        ScoreResult::SignalBundle { signals, .. } => ScoreResult::SignalBundle {
            score: bounded,
            signals,
        },
    })
}

/// Half-width shrinks linearly from 25 to 5 points as data completeness goes from 0 to 1.
pub fn confidence_interval(composite_score: f64, data_completeness: f64) -> ConfidenceInterval {
    let completeness = data_completeness.clamp(0.0, 1.0);
    let half_width = MIN_INTERVAL_HALF_WIDTH + INTERVAL_SPREAD * (1.0 - completeness);
    ConfidenceInterval {
        lower: round2((composite_score - half_width).max(0.0)),
        upper: round2((composite_score + half_width).min(100.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_labels_round_trip() {
        for component in ScoreComponent::ALL {
            assert_eq!(ScoreComponent::parse(component.label()), Some(component));
        }
        assert_eq!(ScoreComponent::parse("unknown"), None);
    }

    #[test]
    fn interval_narrows_as_completeness_grows() {
        let sparse = confidence_interval(50.0, 0.0);
        let partial = confidence_interval(50.0, 0.5);
        let full = confidence_interval(50.0, 1.0);

        assert_eq!(sparse.width(), 50.0);
        assert!(partial.width() < sparse.width());
        assert_eq!(full.width(), 10.0);
    }

    #[test]
    fn interval_is_clamped_to_score_range() {
        let interval = confidence_interval(98.0, 0.0);
        assert_eq!(interval.upper, 100.0);
        assert_eq!(interval.lower, 73.0);
    }
}
