//! Scenario: document queries with a recoverable mistake.
//!
//! The analyzer finds gold-tier clients, tries an operation the tool does
//! not support (a failed observation with no side effect), then updates one
//! client and answers.

use std::sync::Arc;

use serde_json::json;

use maestro_contracts::{error::MaestroResult, step::Action, task::Task};
use maestro_core::AgentDescriptor;
use maestro_model::ScriptedModel;
use maestro_tools::DocumentQueryTool;

use super::{executor, print_journal, print_report};
use crate::mock_data::seeded_document_store;

pub async fn run_scenario() -> MaestroResult<()> {
    println!("=== Scenario: Document queries ===");
    println!();

    let (executor, journal) = executor();
    let store = seeded_document_store();

    let model = ScriptedModel::new([
        Action::tool_call(
            "document_query",
            json!({ "collection": "clients", "operation": "find", "query": { "tier": "gold" } }),
        ),
        Action::tool_call(
            "document_query",
            json!({ "collection": "clients", "operation": "aggregate", "query": {} }),
        ),
        Action::tool_call(
            "document_query",
            json!({
                "collection": "clients",
                "operation": "update_one",
                "query": { "name": "Fabrikam" },
                "data": { "tier": "platinum" }
            }),
        ),
        Action::final_answer("Two gold clients (Northwind, Fabrikam); Fabrikam is now platinum."),
    ])
    .with_id("scripted-analyzer");

    let agent = AgentDescriptor::builder("query_analyzer", Arc::new(model))
        .tool(Arc::new(DocumentQueryTool::new(Arc::new(store.clone()))))?
        .build()?;

    let report = executor
        .run(&agent, Task::new("Which clients are gold tier? Promote Fabrikam to platinum."))
        .await;

    print_report(&report);

    if let Some(found) = report.steps.first().and_then(|s| s.observation.as_ref()) {
        println!("  find → affected_count = {:?}", found.affected_count());
        if let Some(data) = found.data() {
            println!("  find → {data}");
        }
    }
    if let Some(rejected) = report.steps.get(1).and_then(|s| s.observation.as_ref()) {
        println!("  aggregate → {}", rejected.error().unwrap_or("ok"));
    }
    println!();

    print_journal(&journal, &report);
    println!("  Document scenario complete.");
    println!();

    Ok(())
}
