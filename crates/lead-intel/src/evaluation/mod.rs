//! Lead evaluation: concurrent scoring, qualification tracking, agent assistance, and the
//! orchestrator that caches and assembles them into one result.

pub mod aggregator;
pub mod assistance;
pub mod cache;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod orchestrator;
pub mod qualification;
pub mod router;
pub mod scorers;

#[cfg(test)]
mod tests;

pub use aggregator::{
    AdapterOutcome, AggregationError, ConfidenceInterval, ScoreComponent, ScoringAggregator,
    ScoringBreakdown,
};
pub use assistance::{
    ActionPriority, ActionType, AgentAssistanceData, AssistanceGenerator, ConversationStage,
    EngagementLabel, ObjectionAnalysis, ObjectionType, QualificationGap, RecommendedAction,
    Sentiment, UrgencyAnalysis, UrgencySignal,
};
pub use cache::{cache_key, CacheError, InMemoryResultCache, ResultCache};
pub use config::{
    ConfigSource, CriticalFieldSpec, LoadedConfig, ModeSettings, OrchestratorConfig,
    OrchestratorConfigError, ScoringWeights,
};
pub use domain::{
    ConversationTurn, EvaluationContext, EvaluationId, EvaluationMode, LeadId, LeadRecord,
    SpeakerRole,
};
pub use metrics::{EvaluationStats, OrchestratorMetrics};
pub use orchestrator::{
    BatchRequest, EvaluationDiagnostics, EvaluationError, HealthReport, HealthStatus,
    LeadEvaluationOrchestrator, LeadEvaluationResult,
};
pub use qualification::{
    FieldStatus, QualificationField, QualificationProgress, QualificationTier,
    QualificationTracker,
};
pub use router::evaluation_router;
pub use scorers::{LeadScorer, ScoreResult, ScorerError, ScorerKind, ScorerSet};
