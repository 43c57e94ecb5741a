use super::common::*;
use chrono::{Duration, Utc};
use serde_json::json;

use crate::evaluation::config::{CriticalFieldSpec, OrchestratorConfig};
use crate::evaluation::domain::{ConversationTurn, LeadRecord};
use crate::evaluation::qualification::{
    assess_fields, required_completion_percentage, FieldStatus, QualificationTier,
    QualificationTracker,
};

fn tracker() -> QualificationTracker {
    QualificationTracker::new(OrchestratorConfig::standard().critical_fields)
}

#[test]
fn empty_lead_is_unqualified() {
    let (progress, fields) = tracker().track(&LeadRecord::default());

    assert_eq!(progress.tier, QualificationTier::Unqualified);
    assert_eq!(progress.completion_percentage, 0.0);
    assert!(!progress.critical_fields_complete);
    assert_eq!(progress.missing_fields, 13);
    assert_eq!(progress.estimated_completion_minutes, 26);
    assert!(progress.last_completed_field.is_none());
    assert!(progress.milestones_achieved.is_empty());
    assert_eq!(fields.len(), 13);
    assert!(fields
        .values()
        .all(|field| field.status == FieldStatus::Missing));
}

#[test]
fn next_priority_fields_list_required_first_and_cap_optional() {
    let (progress, _) = tracker().track(&LeadRecord::default());
    assert_eq!(
        progress.next_priority_fields,
        vec![
            "budget",
            "financing_status",
            "purchase_timeline",
            "property_type",
            "location_preference",
            "motivation",
        ]
    );

    let lead = LeadRecord::default()
        .with_field("budget", json!("$300k"))
        .with_field("financing_status", json!("cash"))
        .with_field("purchase_timeline", json!("spring"))
        .with_field("property_type", json!("ok"));
    let (progress, _) = tracker().track(&lead);
    assert_eq!(
        progress.next_priority_fields,
        vec![
            "property_type",
            "location_preference",
            "motivation",
            "bedrooms",
            "family_size",
        ]
    );
}

#[test]
fn partial_answers_count_half_and_block_critical_completion() {
    let lead = required_only_lead().with_field("motivation", json!("eh"));
    let (progress, fields) = tracker().track(&lead);

    assert_eq!(fields["motivation"].status, FieldStatus::Partial);
    assert_eq!(progress.partial_fields, 1);
    assert!(!progress.critical_fields_complete);
    assert!(progress
        .next_priority_fields
        .contains(&"motivation".to_string()));
    // (6.5 complete weight + 0.5 partial credit) / 11 total weight
    assert_eq!(progress.completion_percentage, 63.64);
}

#[test]
fn complete_profile_is_hot_and_earns_every_milestone() {
    let (progress, _) = tracker().track(&complete_lead());

    assert_eq!(progress.tier, QualificationTier::HotLead);
    assert_eq!(progress.completion_percentage, 100.0);
    assert!(progress.critical_fields_complete);
    assert!(progress.next_priority_fields.is_empty());
    assert_eq!(progress.estimated_completion_minutes, 0);
    assert_eq!(progress.milestones_achieved.len(), 6);
    assert_eq!(progress.qualification_points, 210);
}

#[test]
fn required_fields_alone_are_not_hot() {
    let (progress, _) = tracker().track(&required_only_lead());

    assert!(progress.critical_fields_complete);
    assert_eq!(progress.completion_percentage, 68.18);
    assert_eq!(progress.tier, QualificationTier::DevelopingLead);
    assert!(progress
        .milestones_achieved
        .contains(&"Qualified Lead".to_string()));
    assert!(!progress
        .milestones_achieved
        .contains(&"Property Profile".to_string()));
}

#[test]
fn completing_required_fields_never_lowers_completeness_or_tier() {
    let ordered = [
        ("budget", json!("$450,000")),
        ("financing_status", json!("pre-approved")),
        ("purchase_timeline", json!("next month")),
        ("property_type", json!("townhouse")),
        ("location_preference", json!("Cedar Park")),
        ("motivation", json!("growing family")),
    ];
    let specs = OrchestratorConfig::standard().critical_fields;
    let tracker = QualificationTracker::new(specs.clone());

    let mut lead = LeadRecord::default();
    let mut last_completeness = 0.0;
    let mut last_rank = 0;
    for (name, value) in ordered {
        lead = lead.with_field(name, value);

        let completeness = required_completion_percentage(&assess_fields(&lead, &specs));
        let (progress, _) = tracker.track(&lead);

        assert!(completeness >= last_completeness);
        assert!(progress.tier.rank() >= last_rank);
        last_completeness = completeness;
        last_rank = progress.tier.rank();
    }
    assert_eq!(last_completeness, 100.0);
}

#[test]
fn last_completed_field_follows_latest_prospect_turn() {
    let earlier = Utc::now() - Duration::minutes(5);
    let lead = LeadRecord::default()
        .with_field("budget", json!("$450k"))
        .with_field("location_preference", json!("Round Rock"))
        .with_turn(ConversationTurn::prospect("Our budget is about $450k", earlier))
        .with_turn(ConversationTurn::prospect(
            "We mostly want to be in Round Rock",
            Utc::now(),
        ));

    let (progress, _) = tracker().track(&lead);
    assert_eq!(
        progress.last_completed_field.as_deref(),
        Some("location_preference")
    );

    let silent = LeadRecord::default()
        .with_field("budget", json!("$450k"))
        .with_field("motivation", json!("downsizing"));
    let (progress, _) = tracker().track(&silent);
    assert_eq!(progress.last_completed_field.as_deref(), Some("motivation"));
}

#[test]
fn milestones_naming_unconfigured_fields_are_ignored() {
    let tracker = QualificationTracker::new(vec![
        CriticalFieldSpec::new("budget", 1, true, 1.0),
        CriticalFieldSpec::new("financing_status", 2, true, 1.0),
    ]);
    let lead = LeadRecord::default()
        .with_field("budget", json!("$450k"))
        .with_field("financing_status", json!("cash"));

    let (progress, _) = tracker.track(&lead);
    assert_eq!(
        progress.milestones_achieved,
        vec!["First Contact".to_string(), "Financial Foundation".to_string()]
    );
    assert_eq!(progress.qualification_points, 35);
    assert_eq!(progress.tier, QualificationTier::HotLead);
}
