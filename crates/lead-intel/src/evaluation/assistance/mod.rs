//! Coaching hints derived from the merged scoring and qualification output.
//!
//! Every heuristic here is synchronous keyword matching over conversation text and must
//! degrade to a neutral answer when the conversation is empty.

mod actions;
pub mod patterns;

pub use actions::{ActionPriority, ActionType, RecommendedAction};
pub use patterns::{ObjectionType, UrgencyFamily};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::aggregator::ScoringBreakdown;
use super::config::{CriticalFieldSpec, OrchestratorConfig};
use super::domain::{ConversationTurn, EvaluationContext, LeadRecord};
use super::qualification::{FieldStatus, QualificationField, QualificationProgress};

/// Fixed confidence attached to keyword-detected objections.
pub const OBJECTION_CONFIDENCE: f64 = 0.75;
const RAW_TEXT_LIMIT: usize = 160;
const MAX_URGENCY: f64 = 10.0;

const POSITIVE_WORDS: &[&str] = &[
    "great", "love", "perfect", "excited", "excellent", "interested", "thanks", "thank you",
    "wonderful", "sounds good",
];
const NEGATIVE_WORDS: &[&str] = &[
    "not interested", "frustrated", "disappointed", "annoyed", "terrible", "waste", "stop",
    "unhappy", "hate",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectionAnalysis {
    pub objection_type: ObjectionType,
    pub matched_keyword: String,
    pub raw_text: String,
    pub severity: f64,
    pub confidence: f64,
    pub suggested_responses: Vec<String>,
    pub compliance_risk: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencySignal {
    pub family: String,
    pub keyword: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyAnalysis {
    pub score: f64,
    pub signals: Vec<UrgencySignal>,
    pub timeline_mentioned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLabel {
    HighlyEngaged,
    Engaged,
    Passive,
    Disengaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    Opening,
    Discovery,
    Qualification,
    ObjectionHandling,
    Closing,
}

/// A next-priority field the agent should ask about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationGap {
    pub field: String,
    pub status: FieldStatus,
    pub priority: u32,
    pub required: bool,
    pub suggested_question: String,
}

/// Real-time coaching output for the agent handling the lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssistanceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub objections: Vec<ObjectionAnalysis>,
    pub urgency: UrgencyAnalysis,
    pub sentiment: Sentiment,
    pub engagement: EngagementLabel,
    pub conversation_stage: ConversationStage,
    pub qualification_gaps: Vec<QualificationGap>,
    pub compliance_flags: Vec<String>,
    pub recommended_actions: Vec<RecommendedAction>,
    pub immediate_actions: Vec<RecommendedAction>,
}

impl AgentAssistanceData {
    pub fn has_compliance_risk(&self) -> bool {
        self.objections.iter().any(|objection| objection.compliance_risk)
    }
}

#[derive(Debug, Clone)]
pub struct AssistanceGenerator {
    objection_patterns: BTreeMap<ObjectionType, Vec<String>>,
    urgency_families: Vec<UrgencyFamily>,
    questions: BTreeMap<String, String>,
}

impl AssistanceGenerator {
    pub fn new(
        objection_patterns: BTreeMap<ObjectionType, Vec<String>>,
        urgency_families: Vec<UrgencyFamily>,
        fields: &[CriticalFieldSpec],
    ) -> Self {
        let questions = fields
            .iter()
            .filter_map(|field| {
                field
                    .question
                    .as_ref()
                    .map(|question| (field.name.clone(), question.clone()))
            })
            .collect();
        Self {
            objection_patterns,
            urgency_families,
            questions,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(
            config.objection_patterns.clone(),
            config.urgency_patterns.clone(),
            &config.critical_fields,
        )
    }

    pub fn generate(
        &self,
        lead: &LeadRecord,
        breakdown: &ScoringBreakdown,
        progress: &QualificationProgress,
        fields: &BTreeMap<String, QualificationField>,
        context: Option<&EvaluationContext>,
    ) -> AgentAssistanceData {
        let objections = self.detect_objections(&lead.conversation);
        let urgency = self.extract_urgency(lead);
        let gaps = self.qualification_gaps(progress, fields);

        let compliance_flags = objections
            .iter()
            .filter(|objection| objection.compliance_risk)
            .map(|objection| {
                format!(
                    "{}: steering language '{}'",
                    objection.objection_type, objection.matched_keyword
                )
            })
            .collect();

        let has_prospect_text = lead.prospect_turns().next().is_some();
        let recommended_actions =
            actions::recommend(breakdown.composite_score, &objections, &urgency, &gaps);
        let immediate_actions = recommended_actions
            .iter()
            .filter(|action| action.priority.is_urgent())
            .cloned()
            .collect();

        AgentAssistanceData {
            agent_id: context.and_then(EvaluationContext::agent_id).map(str::to_string),
            sentiment: sentiment(lead),
            engagement: engagement_label(has_prospect_text, breakdown.engagement_level),
            conversation_stage: conversation_stage(lead, breakdown, progress, &objections),
            objections,
            urgency,
            qualification_gaps: gaps,
            compliance_flags,
            recommended_actions,
            immediate_actions,
        }
    }

    /// One detection per objection type: the earliest turn containing any of its keywords.
    pub fn detect_objections(&self, conversation: &[ConversationTurn]) -> Vec<ObjectionAnalysis> {
        let mut detected = Vec::new();
        for (objection_type, keywords) in &self.objection_patterns {
            let mut scanned = conversation
                .iter()
                .filter(|turn| objection_type.scans_all_speakers() || turn.is_prospect());

            let hit = scanned.find_map(|turn| {
                let lowered = turn.text.to_lowercase();
                keywords
                    .iter()
                    .find(|keyword| lowered.contains(&keyword.to_lowercase()))
                    .map(|keyword| (turn, keyword))
            });

            if let Some((turn, keyword)) = hit {
                detected.push(ObjectionAnalysis {
                    objection_type: *objection_type,
                    matched_keyword: keyword.clone(),
                    raw_text: truncate(&turn.text, RAW_TEXT_LIMIT),
                    severity: objection_type.default_severity(),
                    confidence: OBJECTION_CONFIDENCE,
                    suggested_responses: objection_type.suggested_responses(),
                    compliance_risk: objection_type.is_compliance_risk(),
                });
            }
        }
        detected
    }

    pub fn extract_urgency(&self, lead: &LeadRecord) -> UrgencyAnalysis {
        let mut text = lead
            .prospect_turns()
            .map(|turn| turn.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(timeline) = lead.purchase_timeline() {
            text.push(' ');
            text.push_str(&timeline.to_lowercase());
        }

        let mut score = 0.0;
        let mut timeline_mentioned = false;
        let mut signals = Vec::new();
        for family in &self.urgency_families {
            for keyword in &family.keywords {
                if text.contains(&keyword.to_lowercase()) {
                    score += family.weight;
                    timeline_mentioned |= family.indicates_timeline();
                    signals.push(UrgencySignal {
                        family: family.name.clone(),
                        keyword: keyword.clone(),
                        weight: family.weight,
                    });
                }
            }
        }

        UrgencyAnalysis {
            score: f64::clamp(score, 0.0, MAX_URGENCY),
            signals,
            timeline_mentioned,
        }
    }

    fn qualification_gaps(
        &self,
        progress: &QualificationProgress,
        fields: &BTreeMap<String, QualificationField>,
    ) -> Vec<QualificationGap> {
        progress
            .next_priority_fields
            .iter()
            .filter_map(|name| fields.get(name))
            .map(|field| QualificationGap {
                field: field.name.clone(),
                status: field.status,
                priority: field.priority,
                required: field.required,
                suggested_question: self.question_for(&field.name),
            })
            .collect()
    }

    fn question_for(&self, field: &str) -> String {
        self.questions.get(field).cloned().unwrap_or_else(|| {
            format!(
                "Could you tell me a bit more about your {}?",
                field.replace('_', " ")
            )
        })
    }
}

impl Default for AssistanceGenerator {
    fn default() -> Self {
        Self::from_config(&OrchestratorConfig::standard())
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn sentiment(lead: &LeadRecord) -> Sentiment {
    let mut balance: i32 = 0;
    for turn in lead.prospect_turns() {
        let lowered = turn.text.to_lowercase();
        balance += POSITIVE_WORDS
            .iter()
            .filter(|word| lowered.contains(*word))
            .count() as i32;
        balance -= NEGATIVE_WORDS
            .iter()
            .filter(|word| lowered.contains(*word))
            .count() as i32;
    }
    match balance {
        b if b > 0 => Sentiment::Positive,
        b if b < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

fn engagement_label(has_prospect_text: bool, engagement_level: f64) -> EngagementLabel {
    if !has_prospect_text {
        return EngagementLabel::Passive;
    }
    if engagement_level >= 70.0 {
        EngagementLabel::HighlyEngaged
    } else if engagement_level >= 40.0 {
        EngagementLabel::Engaged
    } else if engagement_level >= 15.0 {
        EngagementLabel::Passive
    } else {
        EngagementLabel::Disengaged
    }
}

fn conversation_stage(
    lead: &LeadRecord,
    breakdown: &ScoringBreakdown,
    progress: &QualificationProgress,
    objections: &[ObjectionAnalysis],
) -> ConversationStage {
    let prospect_turns = lead.prospect_turns().count();
    if prospect_turns == 0 {
        return ConversationStage::Opening;
    }
    if objections.iter().any(|objection| !objection.compliance_risk) {
        ConversationStage::ObjectionHandling
    } else if breakdown.composite_score >= 85.0 && progress.critical_fields_complete {
        ConversationStage::Closing
    } else if progress.completion_percentage >= 50.0 {
        ConversationStage::Qualification
    } else if prospect_turns >= 2 {
        ConversationStage::Discovery
    } else {
        ConversationStage::Opening
    }
}
