use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FIELD_BUDGET: &str = "budget";
pub const FIELD_LOCATION: &str = "location_preference";
pub const FIELD_TIMELINE: &str = "purchase_timeline";
pub const FIELD_FINANCING: &str = "financing_status";
pub const FIELD_SOURCE: &str = "source";

/// Identifier wrapper for prospects handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl LeadId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier minted for every computed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

impl EvaluationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Who spoke a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    Prospect,
    Agent,
    System,
}

/// Single message exchanged with the prospect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: SpeakerRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn prospect(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: SpeakerRole::Prospect,
            text: text.into(),
            timestamp,
        }
    }

    pub fn agent(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: SpeakerRole::Agent,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_prospect(&self) -> bool {
        self.role == SpeakerRole::Prospect
    }
}

/// Raw prospect data supplied by the caller. Never mutated by the evaluation pipeline.
///
/// Structured fields stay an open map so the configured qualification field set can name
/// anything the CRM captures; the well-known real-estate fields get typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl LeadRecord {
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_turn(mut self, turn: ConversationTurn) -> Self {
        self.conversation.push(turn);
        self
    }

    /// Normalized text for a structured field. `None` for absent or null values.
    pub fn field_text(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(value_text)
    }

    pub fn budget(&self) -> Option<String> {
        self.field_text(FIELD_BUDGET)
    }

    pub fn location_preference(&self) -> Option<String> {
        self.field_text(FIELD_LOCATION)
    }

    pub fn purchase_timeline(&self) -> Option<String> {
        self.field_text(FIELD_TIMELINE)
    }

    pub fn financing_status(&self) -> Option<String> {
        self.field_text(FIELD_FINANCING)
    }

    pub fn source(&self) -> Option<String> {
        self.field_text(FIELD_SOURCE)
    }

    pub fn prospect_turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.conversation.iter().filter(|turn| turn.is_prospect())
    }

    pub fn latest_turn_at(&self) -> Option<DateTime<Utc>> {
        self.conversation.iter().map(|turn| turn.timestamp).max()
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.trim().to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(value_text)
                .filter(|part| !part.is_empty())
                .collect();
            Some(parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(key, value)| value_text(value).map(|text| format!("{key}: {text}")))
                .collect();
            Some(parts.join(", "))
        }
    }
}

/// Evaluation profile chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    #[default]
    RealTime,
    Batch,
    Quick,
}

impl EvaluationMode {
    pub fn label(&self) -> &'static str {
        match self {
            EvaluationMode::RealTime => "real_time",
            EvaluationMode::Batch => "batch",
            EvaluationMode::Quick => "quick",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "real_time" | "realtime" => Some(Self::RealTime),
            "batch" => Some(Self::Batch),
            "quick" => Some(Self::Quick),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional caller context accompanying an evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvaluationContext {
    Conversation {
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default)]
        live_turns: Vec<ConversationTurn>,
    },
    Batch {
        batch_id: String,
        #[serde(default)]
        position: usize,
    },
}

impl EvaluationContext {
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            EvaluationContext::Conversation { agent_id, .. } => agent_id.as_deref(),
            EvaluationContext::Batch { .. } => None,
        }
    }

    pub fn live_turns(&self) -> &[ConversationTurn] {
        match self {
            EvaluationContext::Conversation { live_turns, .. } => live_turns,
            EvaluationContext::Batch { .. } => &[],
        }
    }
}

/// Rounds to two decimal places so serialized scores are reproducible.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_text_normalizes_json_values() {
        let lead = LeadRecord::default()
            .with_field("budget", json!("  $450,000 "))
            .with_field("bedrooms", json!(3))
            .with_field("location_preference", json!(["Austin", "Round Rock", ""]))
            .with_field("concerns", Value::Null);

        assert_eq!(lead.budget().as_deref(), Some("$450,000"));
        assert_eq!(lead.field_text("bedrooms").as_deref(), Some("3"));
        assert_eq!(
            lead.location_preference().as_deref(),
            Some("Austin, Round Rock")
        );
        assert_eq!(lead.field_text("concerns"), None);
        assert_eq!(lead.field_text("pets"), None);
    }

    #[test]
    fn lead_record_flattens_structured_fields() {
        let lead: LeadRecord = serde_json::from_value(json!({
            "budget": "500k",
            "conversation": [
                {"role": "prospect", "text": "Hi there", "timestamp": "2025-09-24T10:00:00Z"}
            ]
        }))
        .expect("lead parses");

        assert_eq!(lead.conversation.len(), 1);
        assert!(lead.conversation[0].is_prospect());
        assert_eq!(lead.budget().as_deref(), Some("500k"));
        assert!(!lead.fields.contains_key("conversation"));
    }

    #[test]
    fn evaluation_mode_parses_labels() {
        assert_eq!(EvaluationMode::parse("real-time"), Some(EvaluationMode::RealTime));
        assert_eq!(EvaluationMode::parse("BATCH"), Some(EvaluationMode::Batch));
        assert_eq!(EvaluationMode::parse("quick"), Some(EvaluationMode::Quick));
        assert_eq!(EvaluationMode::parse("slow"), None);
    }
}
