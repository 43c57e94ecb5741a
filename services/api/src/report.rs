use crate::infra::{build_orchestrator, parse_mode, read_lead_file};
use clap::Args;
use lead_intel::error::AppError;
use lead_intel::evaluation::{
    AdapterOutcome, EvaluationMode, LeadEvaluationResult, LeadId, ScoreComponent,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding the lead record (structured fields plus `conversation`)
    #[arg(long)]
    pub(crate) lead_file: PathBuf,
    /// CRM identifier of the lead
    #[arg(long)]
    pub(crate) lead_id: String,
    /// Evaluation mode: real_time, batch, or quick
    #[arg(long, value_parser = parse_mode, default_value = "real_time")]
    pub(crate) mode: EvaluationMode,
    /// Orchestrator configuration document (defaults to the bundled profile)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
}

pub(crate) async fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        lead_file,
        lead_id,
        mode,
        config,
    } = args;

    let lead = read_lead_file(&lead_file)?;
    let orchestrator = build_orchestrator(config.as_deref());
    let result = orchestrator
        .evaluate_lead(&LeadId::new(lead_id), &lead, None, mode)
        .await?;

    println!("{}", render_report(&result));
    Ok(())
}

/// Human-readable summary of one evaluation.
pub(crate) fn render_report(result: &LeadEvaluationResult) -> String {
    let breakdown = &result.scoring_breakdown;
    let progress = &result.qualification_progress;
    let assistance = &result.agent_assistance;
    let mut lines = Vec::new();

    lines.push(format!(
        "Lead {} | mode {} | evaluation {}",
        result.lead_id, result.evaluation_mode, result.evaluation_id.0
    ));
    lines.push(format!(
        "- Composite {:.2} (interval {:.2}-{:.2}) | tier {} | {:.2}% qualified",
        breakdown.composite_score,
        breakdown.confidence_interval.lower,
        breakdown.confidence_interval.upper,
        progress.tier.label(),
        progress.completion_percentage
    ));
    lines.push(format!(
        "- {} complete / {} partial / {} missing | critical fields {}",
        progress.complete_fields,
        progress.partial_fields,
        progress.missing_fields,
        if progress.critical_fields_complete {
            "complete"
        } else {
            "incomplete"
        }
    ));

    lines.push("Components:".to_string());
    for component in ScoreComponent::ALL {
        let weight = breakdown
            .effective_weights
            .get(&component)
            .copied()
            .unwrap_or(0.0);
        lines.push(format!(
            "  - {}: {:.2} (weight {:.4})",
            component,
            breakdown.component(component),
            weight
        ));
    }

    let degraded: Vec<String> = breakdown
        .adapter_outcomes
        .iter()
        .filter_map(|(kind, outcome)| match outcome {
            AdapterOutcome::Ok => None,
            AdapterOutcome::Failed { reason } => Some(format!("{kind} failed ({reason})")),
            AdapterOutcome::Skipped => Some(format!("{kind} skipped")),
        })
        .collect();
    if !degraded.is_empty() {
        lines.push(format!("Adapters: {}", degraded.join("; ")));
    }

    if !progress.next_priority_fields.is_empty() {
        lines.push(format!(
            "Next fields to capture: {}",
            progress.next_priority_fields.join(", ")
        ));
    }

    if !breakdown.urgency_signals.is_empty() {
        lines.push(format!(
            "Urgency signals: {}",
            breakdown.urgency_signals.join(", ")
        ));
    }

    if !assistance.objections.is_empty() {
        lines.push("Objections:".to_string());
        for objection in &assistance.objections {
            lines.push(format!(
                "  - {} (\"{}\")",
                objection.objection_type, objection.matched_keyword
            ));
        }
    }

    for flag in &assistance.compliance_flags {
        lines.push(format!("COMPLIANCE: {flag}"));
    }

    lines.push(format!(
        "Conversation: {:?} stage | {:?} | sentiment {:?}",
        assistance.conversation_stage, assistance.engagement, assistance.sentiment
    ));

    if !result.recommended_actions.is_empty() {
        lines.push("Recommended actions:".to_string());
        for action in &result.recommended_actions {
            lines.push(format!(
                "  - [{:?}] {:?}: {}",
                action.priority, action.action_type, action.rationale
            ));
        }
    }

    let diagnostics = &result.diagnostics;
    lines.push(format!(
        "Diagnostics: {:.1} ms | cache {} | confidence {:.2} | freshness {:.2} | quality {:.2}",
        diagnostics.duration_ms,
        if diagnostics.cache_hit { "hit" } else { "miss" },
        diagnostics.confidence_score,
        diagnostics.data_freshness_score,
        diagnostics.data_quality_score
    ));

    lines.join("\n")
}
