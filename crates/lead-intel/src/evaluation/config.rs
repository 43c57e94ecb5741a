use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::aggregator::ScoreComponent;
use super::assistance::patterns::{
    default_objection_patterns, default_urgency_families, ObjectionType, UrgencyFamily,
};
use super::domain::{EvaluationMode, FIELD_BUDGET, FIELD_TIMELINE};
use super::scorers::ScorerKind;

/// Orchestrator document shipped with the crate.
pub const DEFAULT_DOCUMENT: &str = include_str!("../../config/lead_evaluation.json");

const WEIGHT_SUM_TOLERANCE: f64 = 0.01;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Validation failures for the orchestrator document.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorConfigError {
    #[error("unable to read configuration document: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed configuration document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown scoring component '{0}'")]
    UnknownComponent(String),
    #[error("weight for '{component}' must be within [0, 1], found {value}")]
    InvalidWeight { component: String, value: f64 },
    #[error("scoring weights must not all be zero")]
    ZeroWeights,
    #[error("at least one critical field must be configured")]
    NoFields,
    #[error("priority rank {priority} is shared by '{first}' and '{second}'")]
    DuplicatePriority {
        priority: u32,
        first: String,
        second: String,
    },
    #[error("field weight for '{field}' must be finite and non-negative, found {value}")]
    InvalidFieldWeight { field: String, value: f64 },
    #[error("{mode} mode timeout must be greater than zero")]
    InvalidTimeout { mode: EvaluationMode },
}

/// Validated weight per score component, summing to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    weights: BTreeMap<ScoreComponent, f64>,
}

impl ScoringWeights {
    /// Builds weights from a name keyed mapping, normalizing when the sum drifts.
    pub fn from_named(named: &BTreeMap<String, f64>) -> Result<Self, OrchestratorConfigError> {
        let mut weights: BTreeMap<ScoreComponent, f64> = ScoreComponent::ALL
            .iter()
            .map(|component| (*component, 0.0))
            .collect();

        for (name, value) in named {
            let component = ScoreComponent::parse(name)
                .ok_or_else(|| OrchestratorConfigError::UnknownComponent(name.clone()))?;
            if !value.is_finite() || *value < 0.0 || *value > 1.0 {
                return Err(OrchestratorConfigError::InvalidWeight {
                    component: name.clone(),
                    value: *value,
                });
            }
            weights.insert(component, *value);
        }

        let sum: f64 = weights.values().sum();
        if sum <= 0.0 {
            return Err(OrchestratorConfigError::ZeroWeights);
        }
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warn!(sum, "scoring weights do not sum to 1.0; normalizing");
            for weight in weights.values_mut() {
                *weight /= sum;
            }
        }

        Ok(Self { weights })
    }

    pub fn equal() -> Self {
        let share = 1.0 / ScoreComponent::ALL.len() as f64;
        Self {
            weights: ScoreComponent::ALL
                .iter()
                .map(|component| (*component, share))
                .collect(),
        }
    }

    pub fn weight(&self, component: ScoreComponent) -> f64 {
        self.weights.get(&component).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreComponent, f64)> + '_ {
        self.weights.iter().map(|(component, weight)| (*component, *weight))
    }

    /// Moves the weight of inactive components onto the active ones, proportionally.
    pub fn redistribute(&self, is_active: impl Fn(ScoreComponent) -> bool) -> Self {
        let active_sum: f64 = self
            .iter()
            .filter(|(component, _)| is_active(*component))
            .map(|(_, weight)| weight)
            .sum();
        let active_count = ScoreComponent::ALL
            .iter()
            .filter(|component| is_active(**component))
            .count();

        let weights = self
            .iter()
            .map(|(component, weight)| {
                let adjusted = if !is_active(component) {
                    0.0
                } else if active_sum > 0.0 {
                    weight / active_sum
                } else {
                    1.0 / active_count as f64
                };
                (component, adjusted)
            })
            .collect();

        Self { weights }
    }
}

/// Definition of one qualification field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalFieldSpec {
    pub name: String,
    pub priority: u32,
    pub required: bool,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl CriticalFieldSpec {
    pub fn new(name: &str, priority: u32, required: bool, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            priority,
            required,
            weight,
            question: None,
        }
    }
}

/// Per-mode behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub timeout_ms: u64,
    pub scorers: Vec<ScorerKind>,
    #[serde(default = "enabled")]
    pub read_cache: bool,
    #[serde(default = "enabled")]
    pub write_cache: bool,
}

fn enabled() -> bool {
    true
}

impl ModeSettings {
    pub fn defaults_for(mode: EvaluationMode) -> Self {
        match mode {
            EvaluationMode::RealTime => Self {
                timeout_ms: 5_000,
                scorers: ScorerKind::ALL.to_vec(),
                read_cache: true,
                write_cache: true,
            },
            EvaluationMode::Batch => Self {
                timeout_ms: 30_000,
                scorers: ScorerKind::ALL.to_vec(),
                read_cache: false,
                write_cache: true,
            },
            EvaluationMode::Quick => Self {
                timeout_ms: 2_000,
                scorers: vec![ScorerKind::Rule, ScorerKind::Urgency],
                read_cache: true,
                write_cache: true,
            },
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn runs(&self, kind: ScorerKind) -> bool {
        self.scorers.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldDocument {
    priority: u32,
    #[serde(default)]
    required: bool,
    #[serde(default = "default_field_weight")]
    weight: f64,
    #[serde(default)]
    question: Option<String>,
}

fn default_field_weight() -> f64 {
    1.0
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

/// Raw shape of the configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrchestratorDocument {
    scoring_weights: BTreeMap<String, f64>,
    critical_fields: BTreeMap<String, FieldDocument>,
    #[serde(default)]
    modes: BTreeMap<EvaluationMode, ModeSettings>,
    #[serde(default = "default_cache_ttl")]
    cache_ttl_seconds: u64,
    #[serde(default)]
    objection_patterns: Option<BTreeMap<ObjectionType, Vec<String>>>,
    #[serde(default)]
    urgency_patterns: Option<Vec<UrgencyFamily>>,
}

/// Where the active configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Document,
    Fallback,
}

/// Configuration plus provenance, produced once at construction.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: OrchestratorConfig,
    pub source: ConfigSource,
}

/// Immutable orchestrator configuration, validated once.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub scoring_weights: ScoringWeights,
    /// Ordered by ascending priority rank.
    pub critical_fields: Vec<CriticalFieldSpec>,
    pub modes: BTreeMap<EvaluationMode, ModeSettings>,
    pub cache_ttl: Duration,
    pub objection_patterns: BTreeMap<ObjectionType, Vec<String>>,
    pub urgency_patterns: Vec<UrgencyFamily>,
}

impl OrchestratorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, OrchestratorConfigError> {
        let document: OrchestratorDocument = serde_json::from_str(raw)?;
        Self::from_document(document)
    }

    fn from_document(document: OrchestratorDocument) -> Result<Self, OrchestratorConfigError> {
        let scoring_weights = ScoringWeights::from_named(&document.scoring_weights)?;

        if document.critical_fields.is_empty() {
            return Err(OrchestratorConfigError::NoFields);
        }
        let mut critical_fields = Vec::with_capacity(document.critical_fields.len());
        for (name, field) in document.critical_fields {
            if !field.weight.is_finite() || field.weight < 0.0 {
                return Err(OrchestratorConfigError::InvalidFieldWeight {
                    field: name,
                    value: field.weight,
                });
            }
            critical_fields.push(CriticalFieldSpec {
                name,
                priority: field.priority,
                required: field.required,
                weight: field.weight,
                question: field.question,
            });
        }
        critical_fields.sort_by_key(|field| field.priority);
        for pair in critical_fields.windows(2) {
            if pair[0].priority == pair[1].priority {
                return Err(OrchestratorConfigError::DuplicatePriority {
                    priority: pair[0].priority,
                    first: pair[0].name.clone(),
                    second: pair[1].name.clone(),
                });
            }
        }

        let mut modes = default_modes();
        for (mode, settings) in document.modes {
            if settings.timeout_ms == 0 {
                return Err(OrchestratorConfigError::InvalidTimeout { mode });
            }
            modes.insert(mode, settings);
        }

        Ok(Self {
            scoring_weights,
            critical_fields,
            modes,
            cache_ttl: Duration::from_secs(document.cache_ttl_seconds),
            objection_patterns: document
                .objection_patterns
                .unwrap_or_else(default_objection_patterns),
            urgency_patterns: document
                .urgency_patterns
                .unwrap_or_else(default_urgency_families),
        })
    }

    /// Configuration described by the bundled document.
    pub fn standard() -> Self {
        Self::from_json_str(DEFAULT_DOCUMENT).unwrap_or_else(|err| {
            warn!(error = %err, "bundled configuration invalid; using minimal fallback");
            Self::minimal()
        })
    }

    /// Hard-coded fallback: two required fields and equal component weights.
    pub fn minimal() -> Self {
        Self {
            scoring_weights: ScoringWeights::equal(),
            critical_fields: vec![
                CriticalFieldSpec::new(FIELD_BUDGET, 1, true, 1.0),
                CriticalFieldSpec::new(FIELD_TIMELINE, 2, true, 1.0),
            ],
            modes: default_modes(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            objection_patterns: default_objection_patterns(),
            urgency_patterns: default_urgency_families(),
        }
    }

    /// Reads the document at `path`, or the bundled one when no path is given.
    /// Any failure degrades to [`OrchestratorConfig::minimal`].
    pub fn load(path: Option<&Path>) -> LoadedConfig {
        let parsed = match path {
            Some(path) => std::fs::read_to_string(path)
                .map_err(OrchestratorConfigError::from)
                .and_then(|raw| Self::from_json_str(&raw)),
            None => Self::from_json_str(DEFAULT_DOCUMENT),
        };

        match parsed {
            Ok(config) => {
                info!(
                    fields = config.critical_fields.len(),
                    path = ?path,
                    "lead evaluation configuration loaded"
                );
                LoadedConfig {
                    config,
                    source: ConfigSource::Document,
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = ?path,
                    "lead evaluation configuration rejected; using minimal fallback"
                );
                LoadedConfig {
                    config: Self::minimal(),
                    source: ConfigSource::Fallback,
                }
            }
        }
    }

    pub fn mode(&self, mode: EvaluationMode) -> ModeSettings {
        self.modes
            .get(&mode)
            .cloned()
            .unwrap_or_else(|| ModeSettings::defaults_for(mode))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &CriticalFieldSpec> {
        self.critical_fields.iter().filter(|field| field.required)
    }

    pub fn field_names(&self) -> BTreeSet<&str> {
        self.critical_fields
            .iter()
            .map(|field| field.name.as_str())
            .collect()
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

fn default_modes() -> BTreeMap<EvaluationMode, ModeSettings> {
    [
        EvaluationMode::RealTime,
        EvaluationMode::Batch,
        EvaluationMode::Quick,
    ]
    .into_iter()
    .map(|mode| (mode, ModeSettings::defaults_for(mode)))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_document_parses() {
        let config = OrchestratorConfig::from_json_str(DEFAULT_DOCUMENT).expect("bundled config");
        assert!((config.scoring_weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(config.critical_fields[0].name, "budget");
        assert_eq!(config.required_fields().count(), 6);
        assert_eq!(config.mode(EvaluationMode::RealTime).timeout_ms, 5_000);
    }

    #[test]
    fn weights_are_normalized_when_sum_drifts() {
        let mut named = BTreeMap::new();
        named.insert("rule_score".to_string(), 0.5);
        named.insert("budget_alignment".to_string(), 0.5);
        named.insert("timeline_urgency".to_string(), 1.0);

        let weights = ScoringWeights::from_named(&named).expect("weights valid");
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert!((weights.weight(ScoreComponent::TimelineUrgency) - 0.5).abs() < 1e-9);
        assert_eq!(weights.weight(ScoreComponent::PredictiveScore), 0.0);
    }

    #[test]
    fn unknown_component_is_rejected() {
        let mut named = BTreeMap::new();
        named.insert("vibes".to_string(), 1.0);
        match ScoringWeights::from_named(&named) {
            Err(OrchestratorConfigError::UnknownComponent(name)) => assert_eq!(name, "vibes"),
            other => panic!("expected unknown component, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_priorities_are_rejected() {
        let raw = r#"{
            "scoring_weights": {"rule_score": 1.0},
            "critical_fields": {
                "budget": {"priority": 1, "required": true},
                "timeline": {"priority": 1, "required": true}
            }
        }"#;
        match OrchestratorConfig::from_json_str(raw) {
            Err(OrchestratorConfigError::DuplicatePriority { priority, .. }) => {
                assert_eq!(priority, 1)
            }
            other => panic!("expected duplicate priority error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_document_falls_back_to_minimal() {
        let dir = std::env::temp_dir().join(format!("lead-intel-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("broken.json");
        std::fs::write(&path, "{ not json").expect("write config");

        let loaded = OrchestratorConfig::load(Some(&path));

        assert_eq!(loaded.source, ConfigSource::Fallback);
        assert_eq!(loaded.config, OrchestratorConfig::minimal());
        assert_eq!(loaded.config.required_fields().count(), 2);
        let share = loaded.config.scoring_weights.weight(ScoreComponent::RuleScore);
        assert!((share - 1.0 / 9.0).abs() < 1e-9);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_document_falls_back_to_minimal() {
        let loaded = OrchestratorConfig::load(Some(Path::new("/nonexistent/lead_eval.json")));
        assert_eq!(loaded.source, ConfigSource::Fallback);
    }

    #[test]
    fn redistribute_moves_weight_to_active_components() {
        let weights = ScoringWeights::equal();
        let adjusted = weights.redistribute(|component| component != ScoreComponent::RuleScore);

        assert_eq!(adjusted.weight(ScoreComponent::RuleScore), 0.0);
        assert!((adjusted.total() - 1.0).abs() < 1e-9);
        assert!((adjusted.weight(ScoreComponent::BudgetAlignment) - 0.125).abs() < 1e-9);
    }
}
