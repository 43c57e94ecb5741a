//! Qualification field completion and tier derivation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::CriticalFieldSpec;
use super::domain::{round2, LeadRecord};

/// Free-text values shorter than this many characters count as partial answers.
pub const MIN_CONTENT_CHARS: usize = 3;
const NEXT_PRIORITY_LIMIT: usize = 5;
const MINUTES_PER_MISSING_FIELD: u32 = 2;
const MINUTES_PER_PARTIAL_FIELD: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Complete,
    Partial,
    Missing,
}

impl FieldStatus {
    /// Completion credit used by the weighted percentage and completeness heuristics.
    pub fn credit(&self) -> f64 {
        match self {
            FieldStatus::Complete => 1.0,
            FieldStatus::Partial => 0.5,
            FieldStatus::Missing => 0.0,
        }
    }
}

/// Discrete qualification classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationTier {
    HotLead,
    WarmLead,
    DevelopingLead,
    ColdLead,
    Unqualified,
}

impl QualificationTier {
    /// Ordinal where a larger value is a better qualified lead.
    pub fn rank(&self) -> u8 {
        match self {
            QualificationTier::HotLead => 4,
            QualificationTier::WarmLead => 3,
            QualificationTier::DevelopingLead => 2,
            QualificationTier::ColdLead => 1,
            QualificationTier::Unqualified => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualificationTier::HotLead => "hot_lead",
            QualificationTier::WarmLead => "warm_lead",
            QualificationTier::DevelopingLead => "developing_lead",
            QualificationTier::ColdLead => "cold_lead",
            QualificationTier::Unqualified => "unqualified",
        }
    }

    /// First matching rule wins.
    pub fn derive(completion_percentage: f64, critical_fields_complete: bool) -> Self {
        if completion_percentage >= 85.0 && critical_fields_complete {
            QualificationTier::HotLead
        } else if completion_percentage >= 70.0 {
            QualificationTier::WarmLead
        } else if completion_percentage >= 50.0 {
            QualificationTier::DevelopingLead
        } else if completion_percentage >= 30.0 {
            QualificationTier::ColdLead
        } else {
            QualificationTier::Unqualified
        }
    }
}

/// Per-field assessment returned alongside the progress summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationField {
    pub name: String,
    pub status: FieldStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub priority: u32,
    pub required: bool,
    pub weight: f64,
    pub confidence: f64,
}

/// Snapshot of qualification state, recomputed on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationProgress {
    pub complete_fields: usize,
    pub partial_fields: usize,
    pub missing_fields: usize,
    pub total_fields: usize,
    pub completion_percentage: f64,
    pub critical_fields_complete: bool,
    pub tier: QualificationTier,
    pub last_completed_field: Option<String>,
    pub next_priority_fields: Vec<String>,
    pub estimated_completion_minutes: u32,
    pub milestones_achieved: Vec<String>,
    pub qualification_points: u32,
}

/// Reward checkpoint reached once every listed field is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub points: u32,
}

const REQUIRED_PROFILE: &[&str] = &[
    "budget",
    "financing_status",
    "property_type",
    "location_preference",
    "purchase_timeline",
    "motivation",
];

pub const DEFAULT_MILESTONES: &[Milestone] = &[
    Milestone {
        name: "First Contact",
        fields: &["budget"],
        points: 10,
    },
    Milestone {
        name: "Financial Foundation",
        fields: &["budget", "financing_status"],
        points: 25,
    },
    Milestone {
        name: "Property Profile",
        fields: &["property_type", "location_preference", "bedrooms"],
        points: 30,
    },
    Milestone {
        name: "Timeline Clarity",
        fields: &["purchase_timeline", "motivation"],
        points: 20,
    },
    Milestone {
        name: "Qualified Lead",
        fields: REQUIRED_PROFILE,
        points: 50,
    },
    Milestone {
        name: "Complete Profile",
        fields: &[
            "budget",
            "financing_status",
            "property_type",
            "location_preference",
            "purchase_timeline",
            "motivation",
            "bedrooms",
            "bathrooms",
            "family_size",
        ],
        points: 75,
    },
];

/// Classifies one raw field value.
pub fn field_status(value: Option<&Value>) -> FieldStatus {
    match value {
        None | Some(Value::Null) => FieldStatus::Missing,
        Some(Value::Number(_)) | Some(Value::Bool(_)) => FieldStatus::Complete,
        Some(Value::String(text)) => text_status(text),
        Some(Value::Array(items)) if items.is_empty() => FieldStatus::Missing,
        Some(Value::Object(map)) if map.is_empty() => FieldStatus::Missing,
        Some(Value::Array(_)) | Some(Value::Object(_)) => FieldStatus::Complete,
    }
}

fn text_status(text: &str) -> FieldStatus {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        FieldStatus::Missing
    } else if trimmed.parse::<f64>().is_ok() || trimmed.chars().count() >= MIN_CONTENT_CHARS {
        FieldStatus::Complete
    } else {
        FieldStatus::Partial
    }
}

/// Assesses every configured field against the lead, in priority order.
pub fn assess_fields(lead: &LeadRecord, specs: &[CriticalFieldSpec]) -> Vec<QualificationField> {
    specs
        .iter()
        .map(|spec| {
            let status = field_status(lead.fields.get(&spec.name));
            QualificationField {
                name: spec.name.clone(),
                status,
                value: lead.field_text(&spec.name).filter(|value| !value.is_empty()),
                priority: spec.priority,
                required: spec.required,
                weight: spec.weight,
                confidence: status.credit(),
            }
        })
        .collect()
}

/// Weighted share of completion credit in `[0, 1]`, falling back to counts when every
/// configured weight is zero.
pub fn weighted_completion(fields: &[QualificationField]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let total_weight: f64 = fields.iter().map(|field| field.weight).sum();
    if total_weight > 0.0 {
        fields
            .iter()
            .map(|field| field.weight * field.status.credit())
            .sum::<f64>()
            / total_weight
    } else {
        fields.iter().map(|field| field.status.credit()).sum::<f64>() / fields.len() as f64
    }
}

/// Completed required fields over total required fields, as a percentage.
/// A configuration without required fields is trivially complete.
pub fn required_completion_percentage(fields: &[QualificationField]) -> f64 {
    let required: Vec<_> = fields.iter().filter(|field| field.required).collect();
    if required.is_empty() {
        return 100.0;
    }
    let complete = required
        .iter()
        .filter(|field| field.status == FieldStatus::Complete)
        .count();
    complete as f64 / required.len() as f64 * 100.0
}

/// Derives completion state, tier, and next questions from configured field specs.
#[derive(Debug, Clone)]
pub struct QualificationTracker {
    specs: Vec<CriticalFieldSpec>,
    milestones: Vec<Milestone>,
}

impl QualificationTracker {
    pub fn new(mut specs: Vec<CriticalFieldSpec>) -> Self {
        specs.sort_by_key(|spec| spec.priority);
        Self {
            specs,
            milestones: DEFAULT_MILESTONES.to_vec(),
        }
    }

    pub fn specs(&self) -> &[CriticalFieldSpec] {
        &self.specs
    }

    pub fn track(
        &self,
        lead: &LeadRecord,
    ) -> (QualificationProgress, BTreeMap<String, QualificationField>) {
        let fields = assess_fields(lead, &self.specs);

        let count = |status: FieldStatus| fields.iter().filter(|f| f.status == status).count();
        let complete_fields = count(FieldStatus::Complete);
        let partial_fields = count(FieldStatus::Partial);
        let missing_fields = count(FieldStatus::Missing);

        let completion_percentage = round2(weighted_completion(&fields) * 100.0);
        let critical_fields_complete = fields
            .iter()
            .filter(|field| field.required)
            .all(|field| field.status == FieldStatus::Complete);
        let tier = QualificationTier::derive(completion_percentage, critical_fields_complete);

        let progress = QualificationProgress {
            complete_fields,
            partial_fields,
            missing_fields,
            total_fields: fields.len(),
            completion_percentage,
            critical_fields_complete,
            tier,
            last_completed_field: last_completed_field(lead, &fields),
            next_priority_fields: next_priority_fields(&fields),
            estimated_completion_minutes: missing_fields as u32 * MINUTES_PER_MISSING_FIELD
                + partial_fields as u32 * MINUTES_PER_PARTIAL_FIELD,
            milestones_achieved: Vec::new(),
            qualification_points: 0,
        };
        let progress = self.with_milestones(progress, &fields);

        let details = fields
            .into_iter()
            .map(|field| (field.name.clone(), field))
            .collect();

        (progress, details)
    }

    fn with_milestones(
        &self,
        mut progress: QualificationProgress,
        fields: &[QualificationField],
    ) -> QualificationProgress {
        let configured: BTreeSet<&str> = fields.iter().map(|field| field.name.as_str()).collect();
        let complete: BTreeSet<&str> = fields
            .iter()
            .filter(|field| field.status == FieldStatus::Complete)
            .map(|field| field.name.as_str())
            .collect();

        for milestone in &self.milestones {
            let applicable = milestone.fields.iter().all(|name| configured.contains(name));
            if applicable && milestone.fields.iter().all(|name| complete.contains(name)) {
                progress.milestones_achieved.push(milestone.name.to_string());
                progress.qualification_points += milestone.points;
            }
        }
        progress
    }
}

fn next_priority_fields(fields: &[QualificationField]) -> Vec<String> {
    let incomplete = |required: bool| {
        fields
            .iter()
            .filter(move |field| {
                field.required == required && field.status != FieldStatus::Complete
            })
            .map(|field| field.name.clone())
    };

    let mut next: Vec<String> = incomplete(true).collect();
    let room = NEXT_PRIORITY_LIMIT.saturating_sub(next.len());
    next.extend(incomplete(false).take(room));
    next
}

fn last_completed_field(lead: &LeadRecord, fields: &[QualificationField]) -> Option<String> {
    let complete: Vec<&QualificationField> = fields
        .iter()
        .filter(|field| field.status == FieldStatus::Complete)
        .collect();

    for turn in lead.conversation.iter().rev().filter(|turn| turn.is_prospect()) {
        let text = turn.text.to_lowercase();
        let mentioned = complete.iter().find(|field| {
            field
                .value
                .as_ref()
                .map(|value| value.to_lowercase())
                .is_some_and(|value| {
                    value.chars().count() >= MIN_CONTENT_CHARS && text.contains(&value)
                })
        });
        if let Some(field) = mentioned {
            return Some(field.name.clone());
        }
    }

    complete
        .iter()
        .max_by_key(|field| field.priority)
        .map(|field| field.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_status_respects_minimum_content() {
        assert_eq!(field_status(Some(&json!("  "))), FieldStatus::Missing);
        assert_eq!(field_status(Some(&json!("ok"))), FieldStatus::Partial);
        assert_eq!(field_status(Some(&json!("condo"))), FieldStatus::Complete);
        assert_eq!(field_status(Some(&json!("3"))), FieldStatus::Complete);
        assert_eq!(field_status(Some(&json!(2))), FieldStatus::Complete);
        assert_eq!(field_status(Some(&json!([]))), FieldStatus::Missing);
        assert_eq!(field_status(Some(&Value::Null)), FieldStatus::Missing);
        assert_eq!(field_status(None), FieldStatus::Missing);
    }

    #[test]
    fn tier_rules_apply_in_order() {
        assert_eq!(QualificationTier::derive(90.0, true), QualificationTier::HotLead);
        assert_eq!(QualificationTier::derive(90.0, false), QualificationTier::WarmLead);
        assert_eq!(QualificationTier::derive(70.0, true), QualificationTier::WarmLead);
        assert_eq!(QualificationTier::derive(50.0, false), QualificationTier::DevelopingLead);
        assert_eq!(QualificationTier::derive(30.0, false), QualificationTier::ColdLead);
        assert_eq!(QualificationTier::derive(29.99, true), QualificationTier::Unqualified);
    }

    #[test]
    fn required_completion_counts_only_complete_required_fields() {
        let specs = vec![
            CriticalFieldSpec::new("budget", 1, true, 1.0),
            CriticalFieldSpec::new("purchase_timeline", 2, true, 1.0),
            CriticalFieldSpec::new("pets", 3, false, 1.0),
        ];
        let lead = LeadRecord::default()
            .with_field("budget", json!("$400k"))
            .with_field("purchase_timeline", json!("no"))
            .with_field("pets", json!("one cat"));

        let fields = assess_fields(&lead, &specs);
        assert_eq!(required_completion_percentage(&fields), 50.0);
        assert!((weighted_completion(&fields) - 2.5 / 3.0).abs() < 1e-9);
    }
}
