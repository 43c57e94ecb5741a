use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lead_intel::evaluation::{
    cache_key, AdapterOutcome, BatchRequest, ConversationTurn, EvaluationError, EvaluationMode,
    InMemoryResultCache, LeadEvaluationOrchestrator, LeadEvaluationResult, LeadId, LeadRecord,
    LeadScorer, LoadedConfig, ObjectionType, OrchestratorConfig, QualificationTier, ResultCache,
    ScoreResult, ScorerError, ScorerKind, ScorerSet,
};
use serde_json::json;

fn orchestrator() -> (
    LeadEvaluationOrchestrator<InMemoryResultCache>,
    Arc<InMemoryResultCache>,
) {
    let cache = Arc::new(InMemoryResultCache::new());
    let orchestrator = LeadEvaluationOrchestrator::with_builtin_scorers(
        OrchestratorConfig::load(None),
        cache.clone(),
    );
    (orchestrator, cache)
}

fn qualified_lead() -> LeadRecord {
    LeadRecord::default()
        .with_field("budget", json!("$525,000"))
        .with_field("financing_status", json!("pre-approved"))
        .with_field("purchase_timeline", json!("this month"))
        .with_field("property_type", json!("single family"))
        .with_field("location_preference", json!("Cedar Park"))
        .with_field("motivation", json!("new job in Austin"))
        .with_field("bedrooms", json!(4))
        .with_field("family_size", json!(4))
        .with_field("move_in_date", json!("December"))
        .with_field("down_payment", json!("$105,000"))
        .with_field("bathrooms", json!("2.5"))
        .with_field("current_situation", json!("renting month to month"))
        .with_field("decision_makers", json!("both spouses"))
        .with_turn(ConversationTurn::prospect(
            "We're ready to move this week, can we tour on Saturday?",
            Utc::now(),
        ))
}

#[tokio::test]
async fn empty_lead_is_unqualified_with_neutral_components() {
    let (orchestrator, _) = orchestrator();

    let result = orchestrator
        .evaluate_lead(
            &LeadId::new("scenario-a"),
            &LeadRecord::default(),
            None,
            EvaluationMode::RealTime,
        )
        .await
        .expect("empty lead evaluates");

    assert_eq!(result.qualification_progress.tier, QualificationTier::Unqualified);
    assert_eq!(result.qualification_progress.completion_percentage, 0.0);
    assert_eq!(result.scoring_breakdown.communication_quality, 50.0);
    assert_eq!(result.scoring_breakdown.engagement_level, 0.0);
    assert!(result.scoring_breakdown.composite_score < 10.0);
    assert!(result.agent_assistance.objections.is_empty());
}

#[tokio::test]
async fn urgent_fully_qualified_lead_is_hot() {
    let (orchestrator, _) = orchestrator();

    let result = orchestrator
        .evaluate_lead(
            &LeadId::new("scenario-b"),
            &qualified_lead(),
            None,
            EvaluationMode::RealTime,
        )
        .await
        .expect("qualified lead evaluates");

    let progress = &result.qualification_progress;
    assert!(progress.critical_fields_complete);
    assert!(progress.completion_percentage >= 85.0);
    assert_eq!(progress.tier, QualificationTier::HotLead);
    assert!(result.scoring_breakdown.timeline_urgency >= 60.0);
    assert!(result
        .scoring_breakdown
        .urgency_signals
        .iter()
        .any(|signal| signal.contains("this week")));
    assert!(result.agent_assistance.urgency.timeline_mentioned);
}

#[tokio::test]
async fn steering_keyword_emits_compliance_signal() {
    let (orchestrator, _) = orchestrator();
    let lead = qualified_lead().with_turn(ConversationTurn::prospect(
        "Is it a safe neighborhood? We don't want to be near those people.",
        Utc::now(),
    ));

    let result = orchestrator
        .evaluate_lead(&LeadId::new("scenario-c"), &lead, None, EvaluationMode::RealTime)
        .await
        .expect("lead evaluates");

    assert!(result.qualification_progress.critical_fields_complete);
    let detections: Vec<_> = result
        .agent_assistance
        .objections
        .iter()
        .filter(|objection| objection.objection_type == ObjectionType::FairHousing)
        .collect();
    assert_eq!(detections.len(), 1);
    assert!(detections[0].compliance_risk);
    assert!(!result.agent_assistance.compliance_flags.is_empty());
}

#[tokio::test]
async fn fifty_concurrent_batch_leads_stay_isolated() {
    let (orchestrator, cache) = orchestrator();
    let requests: Vec<BatchRequest> = (0..50)
        .map(|index| BatchRequest {
            lead_id: LeadId::new(format!("batch-{index:02}")),
            lead: LeadRecord::default()
                .with_field("budget", json!(format!("${}", 200_000 + index * 5_000)))
                .with_field("source", json!(if index % 2 == 0 { "referral" } else { "social" })),
        })
        .collect();

    let results = orchestrator.evaluate_batch(requests.clone()).await;

    assert_eq!(results.len(), 50);
    assert_eq!(cache.len().await, 50);
    for (request, result) in requests.iter().zip(results) {
        let result = result.expect("batch entry evaluates");
        assert_eq!(result.lead_id, request.lead_id);
        assert_eq!(
            result.qualification_fields["budget"].value,
            request.lead.budget()
        );

        let key = cache_key(&request.lead_id, &request.lead, &[], &ScorerKind::ALL).expect("key");
        let cached = cache
            .get(&key)
            .await
            .expect("cache read")
            .expect("entry written");
        let cached: LeadEvaluationResult = serde_json::from_str(&cached).expect("decodes");
        assert_eq!(cached.lead_id, request.lead_id);
        assert_eq!(cached.scoring_breakdown, result.scoring_breakdown);
    }
    assert_eq!(orchestrator.get_stats().total_evaluations, 50);
}

#[tokio::test]
async fn identical_requests_within_ttl_are_idempotent() {
    let (orchestrator, _) = orchestrator();
    let lead_id = LeadId::new("idempotent");
    let lead = qualified_lead();

    let first = orchestrator
        .evaluate_lead(&lead_id, &lead, None, EvaluationMode::RealTime)
        .await
        .expect("first");
    let second = orchestrator
        .evaluate_lead(&lead_id, &lead, None, EvaluationMode::RealTime)
        .await
        .expect("second");

    assert!(second.diagnostics.cache_hit);
    assert_eq!(
        serde_json::to_vec(&first.scoring_breakdown).expect("encode"),
        serde_json::to_vec(&second.scoring_breakdown).expect("encode")
    );
    assert_eq!(
        serde_json::to_vec(&first.qualification_progress).expect("encode"),
        serde_json::to_vec(&second.qualification_progress).expect("encode")
    );
}

#[tokio::test]
async fn more_complete_required_fields_never_lower_the_outcome() {
    let (orchestrator, _) = orchestrator();
    let steps = [
        ("budget", "$525,000"),
        ("financing_status", "cash"),
        ("purchase_timeline", "next month"),
        ("property_type", "condo"),
        ("location_preference", "Downtown"),
        ("motivation", "downsizing"),
    ];

    let mut lead = LeadRecord::default();
    let mut previous: Option<(f64, u8)> = None;
    for (index, (field, value)) in steps.into_iter().enumerate() {
        lead = lead.with_field(field, json!(value));
        let result = orchestrator
            .evaluate_lead(
                &LeadId::new(format!("monotonic-{index}")),
                &lead,
                None,
                EvaluationMode::RealTime,
            )
            .await
            .expect("evaluates");

        let current = (
            result.scoring_breakdown.qualification_completeness,
            result.qualification_progress.tier.rank(),
        );
        if let Some((completeness, rank)) = previous {
            assert!(current.0 >= completeness);
            assert!(current.1 >= rank);
        }
        previous = Some(current);
    }
}

struct BrokenModel;

#[async_trait]
impl LeadScorer for BrokenModel {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Predictive
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        Err(ScorerError::InvalidOutput {
            kind: ScorerKind::Predictive,
            reason: "feature vector shape mismatch".to_string(),
        })
    }
}

struct StalledModel;

#[async_trait]
impl LeadScorer for StalledModel {
    fn kind(&self) -> ScorerKind {
        ScorerKind::Intelligence
    }

    async fn score(&self, _lead: &LeadRecord) -> Result<ScoreResult, ScorerError> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(ScoreResult::numeric(90.0))
    }
}

#[tokio::test]
async fn one_failing_adapter_keeps_the_evaluation_alive() {
    let mut scorers = ScorerSet::builtin();
    let baseline = LeadEvaluationOrchestrator::new(
        OrchestratorConfig::load(None),
        scorers.clone(),
        Arc::new(InMemoryResultCache::new()),
    );
    scorers.predictive = Arc::new(BrokenModel);
    let degraded = LeadEvaluationOrchestrator::new(
        OrchestratorConfig::load(None),
        scorers,
        Arc::new(InMemoryResultCache::new()),
    );
    let lead_id = LeadId::new("partial");
    let lead = qualified_lead();

    let healthy = baseline
        .evaluate_lead(&lead_id, &lead, None, EvaluationMode::RealTime)
        .await
        .expect("baseline");
    let result = degraded
        .evaluate_lead(&lead_id, &lead, None, EvaluationMode::RealTime)
        .await
        .expect("partial failure still evaluates");

    let breakdown = &result.scoring_breakdown;
    assert_eq!(breakdown.predictive_score, 0.0);
    assert_eq!(breakdown.rule_score, healthy.scoring_breakdown.rule_score);
    assert_eq!(
        breakdown.intelligence_score,
        healthy.scoring_breakdown.intelligence_score
    );
    assert_eq!(
        breakdown.timeline_urgency,
        healthy.scoring_breakdown.timeline_urgency
    );
    assert!(matches!(
        breakdown.adapter_outcomes[&ScorerKind::Predictive],
        AdapterOutcome::Failed { .. }
    ));
    assert!(result.diagnostics.data_quality_score < healthy.diagnostics.data_quality_score);
}

#[tokio::test(start_paused = true)]
async fn stalled_adapter_fails_the_evaluation_at_the_deadline() {
    let mut scorers = ScorerSet::builtin();
    scorers.intelligence = Arc::new(StalledModel);
    let orchestrator = LeadEvaluationOrchestrator::new(
        LoadedConfig {
            config: OrchestratorConfig::standard(),
            source: lead_intel::evaluation::ConfigSource::Document,
        },
        scorers,
        Arc::new(InMemoryResultCache::new()),
    );
    let started = tokio::time::Instant::now();

    let outcome = orchestrator
        .evaluate_lead(
            &LeadId::new("stalled"),
            &qualified_lead(),
            None,
            EvaluationMode::RealTime,
        )
        .await;

    assert!(matches!(
        outcome,
        Err(EvaluationError::Timeout { timeout_ms: 5_000, .. })
    ));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(orchestrator.get_stats().timeouts, 1);
}
