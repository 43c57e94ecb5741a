//! Component scores derived directly from lead data, each on a 0-100 scale.

use crate::evaluation::domain::{LeadRecord, FIELD_BUDGET, FIELD_FINANCING, FIELD_LOCATION};
use crate::evaluation::qualification::{field_status, FieldStatus};
use crate::evaluation::scorers::is_strong_financing;

/// Communication quality reported when the prospect has not written anything yet.
pub const NEUTRAL_COMMUNICATION: f64 = 50.0;

pub(crate) fn budget_alignment(lead: &LeadRecord) -> f64 {
    let base: f64 = match field_status(lead.fields.get(FIELD_BUDGET)) {
        FieldStatus::Missing => return 0.0,
        FieldStatus::Partial => return 25.0,
        FieldStatus::Complete => 60.0,
    };

    let mut score = base;
    if lead
        .budget()
        .is_some_and(|budget| budget.chars().any(|c| c.is_ascii_digit()))
    {
        score += 20.0;
    }

    match field_status(lead.fields.get(FIELD_FINANCING)) {
        FieldStatus::Complete => {
            let strong = lead
                .financing_status()
                .is_some_and(|status| is_strong_financing(&status));
            score += if strong { 20.0 } else { 10.0 };
        }
        FieldStatus::Partial | FieldStatus::Missing => {}
    }

    score.min(100.0)
}

pub(crate) fn location_preference(lead: &LeadRecord) -> f64 {
    match field_status(lead.fields.get(FIELD_LOCATION)) {
        FieldStatus::Missing => 0.0,
        FieldStatus::Partial => 30.0,
        FieldStatus::Complete => {
            let areas = lead
                .location_preference()
                .map(|value| {
                    value
                        .split([',', ';', '/'])
                        .filter(|area| !area.trim().is_empty())
                        .count()
                })
                .unwrap_or(0)
                .max(1);
            (60.0 + 10.0 * (areas - 1) as f64).min(100.0)
        }
    }
}

/// Urgency detector reports on 0-10; scaled ×10 and capped.
pub(crate) fn timeline_urgency(raw_urgency: f64) -> f64 {
    (raw_urgency * 10.0).clamp(0.0, 100.0)
}

pub(crate) fn engagement_level(lead: &LeadRecord) -> f64 {
    let stats = ProspectStats::collect(lead);
    if stats.turns == 0 {
        return 0.0;
    }

    let mut score = (stats.turns as f64 * 12.0).min(60.0);
    score += (stats.average_words() * 1.5).min(25.0);
    if stats.questions > 0 {
        score += 15.0;
    }
    score.min(100.0)
}

pub(crate) fn communication_quality(lead: &LeadRecord) -> f64 {
    let stats = ProspectStats::collect(lead);
    if stats.words == 0 {
        return NEUTRAL_COMMUNICATION;
    }

    let mut score = NEUTRAL_COMMUNICATION;
    if stats.average_words() >= 5.0 {
        score += 20.0;
    }
    if stats.mentions_numbers {
        score += 15.0;
    }
    if stats.questions > 0 {
        score += 15.0;
    }
    score.min(100.0)
}

#[derive(Debug, Default)]
struct ProspectStats {
    turns: usize,
    words: usize,
    questions: usize,
    mentions_numbers: bool,
}

impl ProspectStats {
    fn collect(lead: &LeadRecord) -> Self {
        let mut stats = Self::default();
        for turn in lead.prospect_turns() {
            stats.turns += 1;
            stats.words += turn.text.split_whitespace().count();
            stats.questions += turn.text.matches('?').count();
            stats.mentions_numbers |= turn.text.chars().any(|c| c.is_ascii_digit());
        }
        stats
    }

    fn average_words(&self) -> f64 {
        if self.turns == 0 {
            0.0
        } else {
            self.words as f64 / self.turns as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::domain::ConversationTurn;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn budget_alignment_rewards_numbers_and_financing() {
        let lead = LeadRecord::default()
            .with_field("budget", json!("$450,000"))
            .with_field("financing_status", json!("cash buyer"));
        assert_eq!(budget_alignment(&lead), 100.0);

        let vague = LeadRecord::default().with_field("budget", json!("flexible"));
        assert_eq!(budget_alignment(&vague), 60.0);
        assert_eq!(budget_alignment(&LeadRecord::default()), 0.0);
    }

    #[test]
    fn location_preference_grows_with_areas() {
        let lead =
            LeadRecord::default().with_field("location_preference", json!("Austin, Cedar Park"));
        assert_eq!(location_preference(&lead), 70.0);
    }

    #[test]
    fn timeline_urgency_scales_and_caps() {
        assert_eq!(timeline_urgency(4.5), 45.0);
        assert_eq!(timeline_urgency(12.0), 100.0);
    }

    #[test]
    fn conversation_components_degrade_on_empty_history() {
        let empty = LeadRecord::default();
        assert_eq!(engagement_level(&empty), 0.0);
        assert_eq!(communication_quality(&empty), NEUTRAL_COMMUNICATION);

        let chatty = LeadRecord::default().with_turn(ConversationTurn::prospect(
            "Do you have any 3 bedroom homes near downtown?",
            Utc::now(),
        ));
        assert!(engagement_level(&chatty) > 0.0);
        assert_eq!(communication_quality(&chatty), 100.0);
    }
}
