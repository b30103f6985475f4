//! Scenario: orchestrator → query analyzer → report generator.
//!
//! The orchestrator never touches a database. It delegates a data question
//! to `query_analyzer` (SQL over the seeded `users` table), hands the figures
//! to `report_generator` (which files the report in the document store), and
//! answers with the summary. Each sub-run shows up as one orchestrator step.

use std::sync::Arc;

use serde_json::json;

use maestro_contracts::{error::MaestroResult, step::Action, task::Task};
use maestro_core::{spawn_delegate, AgentDescriptor};
use maestro_model::ScriptedModel;
use maestro_tools::DocumentQueryTool;

use super::{executor, print_journal, print_report};
use crate::mock_data::{seeded_document_store, seeded_sql_tool};

const DELEGATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

pub async fn run_scenario() -> MaestroResult<()> {
    println!("=== Scenario: Delegation (orchestrator → query_analyzer → report_generator) ===");
    println!();

    let (executor, journal) = executor();
    let store = seeded_document_store();

    // ── Sub-agents ───────────────────────────────────────────────────────────

    let analyzer_model = ScriptedModel::new([
        Action::tool_call(
            "sql_query",
            json!({
                "query": "SELECT plan, count(*) AS signups, sum(monthly_spend) AS mrr \
                          FROM users WHERE signup_month = ? GROUP BY plan ORDER BY plan",
                "params": ["2024-05"]
            }),
        ),
        Action::final_answer("May 2024 signups: pro 2 (MRR 892.5), starter 1 (MRR 49.0)."),
    ])
    .with_id("scripted-analyzer");

    let query_analyzer = AgentDescriptor::builder("query_analyzer", Arc::new(analyzer_model))
        .description("Analyzes user queries and retrieves the necessary data from the database.")
        .tool(Arc::new(seeded_sql_tool().await?))?
        .step_budget(6)
        .build()?;

    let reporter_model = ScriptedModel::new([
        Action::tool_call(
            "document_query",
            json!({
                "collection": "reports",
                "operation": "insert_one",
                "data": {
                    "_id": "rpt-2024-05",
                    "title": "May 2024 signups",
                    "body": "Three new accounts; pro dominates new MRR."
                }
            }),
        ),
        Action::final_answer("Report rpt-2024-05 filed: three new accounts, pro plan brings 95% of new MRR."),
    ])
    .with_id("scripted-reporter");

    let report_generator = AgentDescriptor::builder("report_generator", Arc::new(reporter_model))
        .description("Generates business reports from insights provided by another agent.")
        .tool(Arc::new(DocumentQueryTool::new(Arc::new(store.clone()))))?
        .build()?;

    let analyzer_handle = spawn_delegate(executor.clone(), Arc::new(query_analyzer), DELEGATION_TIMEOUT);
    let reporter_handle = spawn_delegate(executor.clone(), Arc::new(report_generator), DELEGATION_TIMEOUT);

    // ── Orchestrator ─────────────────────────────────────────────────────────

    let orchestrator_model = ScriptedModel::new([
        Action::tool_call(
            "query_analyzer",
            json!({ "task": "How many users signed up in May 2024, per plan, and what MRR do they bring?" }),
        ),
        Action::tool_call(
            "report_generator",
            json!({
                "task": "Write a short business report on May 2024 signups.",
                "additional_args": { "figures": "pro 2 (MRR 892.5), starter 1 (MRR 49.0)" }
            }),
        ),
        Action::final_answer("Report rpt-2024-05 filed: three new accounts, pro plan brings 95% of new MRR."),
    ])
    .with_id("scripted-orchestrator");

    let orchestrator = AgentDescriptor::builder("orchestrator", Arc::new(orchestrator_model))
        .description("Orchestrates the other agents.")
        .manage(analyzer_handle)?
        .manage(reporter_handle)?
        .build()?;

    println!("  Orchestrator tools: {:?}", orchestrator.registry().names().collect::<Vec<_>>());
    println!();

    let report = executor
        .run(&orchestrator, Task::new("Give me a report on May 2024 signups."))
        .await;

    print_report(&report);
    print_journal(&journal, &report);

    println!("  Runs sealed in journal:  {} (orchestrator + 2 sub-runs)", journal.archived_runs().len());
    println!("  Reports in store:        {}", store.documents("reports").len());
    println!();
    println!("  Delegation scenario complete.");
    println!();

    Ok(())
}
