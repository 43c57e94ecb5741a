use serde::{Deserialize, Serialize};

use super::{ObjectionAnalysis, QualificationGap, UrgencyAnalysis};
use crate::evaluation::domain::round2;

const CLOSE_READY_COMPOSITE: f64 = 85.0;
const NURTURE_COMPOSITE: f64 = 40.0;
const CALL_URGENCY: f64 = 7.0;
const QUESTION_ACTION_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Immediate,
    High,
    Medium,
    Low,
}

impl ActionPriority {
    pub fn is_urgent(&self) -> bool {
        matches!(self, ActionPriority::Immediate | ActionPriority::High)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ScheduleAppointment,
    HandleObjection,
    ComplianceReview,
    ScheduleCall,
    AskQualifyingQuestion,
    NurtureSequence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action_type: ActionType,
    pub priority: ActionPriority,
    pub rationale: String,
    pub confidence: f64,
}

impl RecommendedAction {
    fn new(
        action_type: ActionType,
        priority: ActionPriority,
        rationale: String,
        confidence: f64,
    ) -> Self {
        Self {
            action_type,
            priority,
            rationale,
            confidence: round2(confidence.clamp(0.0, 1.0)),
        }
    }
}

/// One action per trigger, ordered by priority. Ties keep trigger order.
pub(super) fn recommend(
    composite_score: f64,
    objections: &[ObjectionAnalysis],
    urgency: &UrgencyAnalysis,
    gaps: &[QualificationGap],
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if composite_score >= CLOSE_READY_COMPOSITE {
        actions.push(RecommendedAction::new(
            ActionType::ScheduleAppointment,
            ActionPriority::Immediate,
            format!(
                "Composite score {composite_score:.2} indicates the lead is ready for a showing"
            ),
            composite_score / 100.0,
        ));
    }

    for objection in objections {
        actions.push(RecommendedAction::new(
            ActionType::HandleObjection,
            ActionPriority::High,
            format!(
                "Address {} objection raised in: \"{}\"",
                objection.objection_type, objection.raw_text
            ),
            objection.confidence,
        ));
        if objection.compliance_risk {
            actions.push(RecommendedAction::new(
                ActionType::ComplianceReview,
                ActionPriority::High,
                format!(
                    "Fair housing steering language detected ('{}'); review before responding",
                    objection.matched_keyword
                ),
                0.95,
            ));
        }
    }

    if urgency.score >= CALL_URGENCY && composite_score < CLOSE_READY_COMPOSITE {
        actions.push(RecommendedAction::new(
            ActionType::ScheduleCall,
            ActionPriority::High,
            format!("Urgency score {:.1} suggests calling while intent is high", urgency.score),
            urgency.score / 10.0,
        ));
    }

    for gap in gaps.iter().take(QUESTION_ACTION_LIMIT) {
        actions.push(RecommendedAction::new(
            ActionType::AskQualifyingQuestion,
            ActionPriority::Medium,
            format!("Capture {}: {}", gap.field, gap.suggested_question),
            0.8,
        ));
    }

    if composite_score < NURTURE_COMPOSITE {
        actions.push(RecommendedAction::new(
            ActionType::NurtureSequence,
            ActionPriority::Low,
            format!("Composite score {composite_score:.2} is below the active pursuit threshold"),
            0.6,
        ));
    }

    actions.sort_by_key(|action| action.priority);
    actions
}
