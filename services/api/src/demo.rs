use crate::infra::{build_orchestrator, parse_mode};
use crate::report::render_report;
use chrono::{Duration, Utc};
use clap::Args;
use lead_intel::error::AppError;
use lead_intel::evaluation::{
    ConversationTurn, EvaluationContext, EvaluationMode, LeadId, LeadRecord,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Evaluation mode applied to every sample lead
    #[arg(long, value_parser = parse_mode, default_value = "real_time")]
    pub(crate) mode: EvaluationMode,
    /// Orchestrator configuration document (defaults to the bundled profile)
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    /// Print full JSON results instead of the text report
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { mode, config, json } = args;
    let orchestrator = build_orchestrator(config.as_deref());

    println!("Lead evaluation demo ({mode} mode)");
    for (lead_id, lead, context) in sample_leads() {
        let result = orchestrator
            .evaluate_lead(&LeadId::new(lead_id), &lead, context.as_ref(), mode)
            .await?;

        println!();
        if json {
            let encoded = serde_json::to_string_pretty(&result)
                .map_err(|err| AppError::Input(format!("failed to encode result: {err}")))?;
            println!("{encoded}");
        } else {
            println!("{}", render_report(&result));
        }
    }

    let stats = orchestrator.get_stats();
    println!(
        "\n{} evaluations | {:.1} ms average latency | {} errors",
        stats.total_evaluations, stats.average_latency_ms, stats.errors
    );
    Ok(())
}

/// A cold web lead, a warm lead with a pricing objection, and a hot relocation lead.
pub(crate) fn sample_leads() -> Vec<(&'static str, LeadRecord, Option<EvaluationContext>)> {
    let now = Utc::now();

    let cold = LeadRecord::default()
        .with_field("source", json!("website"))
        .with_turn(ConversationTurn::prospect(
            "Just browsing for now, maybe next year.",
            now - Duration::days(21),
        ));

    let warm = LeadRecord::default()
        .with_field("budget", json!("$380,000"))
        .with_field("property_type", json!("townhome"))
        .with_field("location_preference", json!("Pflugerville"))
        .with_field("bedrooms", json!(3))
        .with_field("source", json!("zillow"))
        .with_turn(ConversationTurn::agent(
            "Happy to help! What matters most in your next home?",
            now - Duration::hours(30),
        ))
        .with_turn(ConversationTurn::prospect(
            "Honestly the prices seem too expensive right now. We'd like something in the next few months.",
            now - Duration::hours(29),
        ));

    let hot = LeadRecord::default()
        .with_field("budget", json!("$650,000"))
        .with_field("financing_status", json!("pre-approved"))
        .with_field("purchase_timeline", json!("within 30 days"))
        .with_field("property_type", json!("single family"))
        .with_field("location_preference", json!("Round Rock"))
        .with_field("motivation", json!("job relocation"))
        .with_field("bedrooms", json!(4))
        .with_field("bathrooms", json!(3))
        .with_field("down_payment", json!("$130,000"))
        .with_field("move_in_date", json!("next month"))
        .with_field("decision_makers", json!("me and my partner"))
        .with_field("family_size", json!(4))
        .with_field("current_situation", json!("lease ends in five weeks"))
        .with_field("source", json!("referral"));
    let live_turns = vec![ConversationTurn::prospect(
        "We need to move ASAP, can we see the Oak Street listing this weekend?",
        now,
    )];

    vec![
        ("demo-cold", cold, None),
        ("demo-warm", warm, None),
        (
            "demo-hot",
            hot,
            Some(EvaluationContext::Conversation {
                agent_id: Some("agent-17".to_string()),
                live_turns,
            }),
        ),
    ]
}
