use async_trait::async_trait;

use super::{LeadScorer, ScoreResult, ScorerError, ScorerKind};
use crate::evaluation::assistance::patterns::{default_urgency_families, UrgencyFamily};
use crate::evaluation::domain::{
    LeadRecord, FIELD_BUDGET, FIELD_FINANCING, FIELD_LOCATION, FIELD_TIMELINE,
};

const RULE_POINTS: [(&str, f64); 6] = [
    (FIELD_BUDGET, 20.0),
    (FIELD_FINANCING, 20.0),
    (FIELD_TIMELINE, 20.0),
    (FIELD_LOCATION, 15.0),
    ("property_type", 10.0),
    ("motivation", 10.0),
];

/// Awards fixed points for each qualifying fact captured on the lead.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldRuleScorer;

#[async_trait]
impl LeadScorer for FieldRuleScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Rule
    }

    async fn score(&self, lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        let mut total: f64 = 0.0;
        for (field, points) in RULE_POINTS {
            if lead.field_text(field).is_some_and(|value| !value.is_empty()) {
                total += points;
            }
        }

        if lead
            .financing_status()
            .is_some_and(|status| is_strong_financing(&status))
        {
            total += 5.0;
        }

        Ok(ScoreResult::numeric(total.min(100.0)))
    }
}

/// Scores how substantive the prospect's side of the conversation is.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConversationIntelligenceScorer;

#[async_trait]
impl LeadScorer for ConversationIntelligenceScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Intelligence
    }

    async fn score(&self, lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        let mut turns = 0usize;
        let mut questions = 0usize;
        let mut words = 0usize;
        for turn in lead.prospect_turns() {
            turns += 1;
            questions += turn.text.matches('?').count();
            words += turn.text.split_whitespace().count();
        }

        let score = turns as f64 * 10.0 + questions as f64 * 8.0 + words.min(200) as f64 / 4.0;
        Ok(ScoreResult::numeric(score.min(100.0)))
    }
}

/// Conversion prior keyed on the lead source channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourcePredictiveScorer;

impl SourcePredictiveScorer {
    fn source_prior(source: Option<&str>) -> f64 {
        let Some(source) = source else {
            return 35.0;
        };
        let source = source.to_ascii_lowercase();
        if source.contains("referral") {
            80.0
        } else if source.contains("open_house") || source.contains("open house") {
            65.0
        } else if source.contains("website") || source.contains("organic") {
            60.0
        } else if source.contains("zillow") || source.contains("portal") {
            55.0
        } else if source.contains("social") {
            45.0
        } else if source.contains("paid") || source.contains("ads") {
            40.0
        } else {
            35.0
        }
    }
}

#[async_trait]
impl LeadScorer for SourcePredictiveScorer {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Predictive
    }

    async fn score(&self, lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        let mut score = Self::source_prior(lead.source().as_deref());
        if lead
            .financing_status()
            .is_some_and(|status| is_strong_financing(&status))
        {
            score += 10.0;
        }
        if lead.prospect_turns().count() >= 3 {
            score += 5.0;
        }
        Ok(ScoreResult::numeric(score.min(100.0)))
    }
}

/// Counts urgency keywords in prospect turns; each distinct keyword adds its family weight.
#[derive(Debug, Clone)]
pub struct KeywordUrgencyDetector {
    families: Vec<UrgencyFamily>,
}

impl KeywordUrgencyDetector {
    pub fn new(families: Vec<UrgencyFamily>) -> Self {
        Self { families }
    }
}

impl Default for KeywordUrgencyDetector {
    fn default() -> Self {
        Self::new(default_urgency_families())
    }
}

#[async_trait]
impl LeadScorer for KeywordUrgencyDetector {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Urgency
    }

    async fn score(&self, lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        let text = lead
            .prospect_turns()
            .map(|turn| turn.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        let timeline = lead
            .purchase_timeline()
            .map(|value| value.to_lowercase())
            .unwrap_or_default();

        let mut score: f64 = 0.0;
        let mut signals = Vec::new();
        for family in &self.families {
            for keyword in &family.keywords {
                let keyword = keyword.to_lowercase();
                if text.contains(&keyword) || timeline.contains(&keyword) {
                    score += family.weight;
                    signals.push(format!("{}:{}", family.name, keyword));
                }
            }
        }

        Ok(ScoreResult::SignalBundle {
            score: score.clamp(0.0, 10.0),
            signals,
        })
    }
}

pub(crate) fn is_strong_financing(status: &str) -> bool {
    let status = status.to_ascii_lowercase();
    status.contains("pre-approved")
        || status.contains("preapproved")
        || status.contains("pre approved")
        || status.contains("cash")
}
