//! Scenario: a model stuck on a tool that does not exist.
//!
//! The agent has a budget of 3 steps and its model keeps proposing `X`.
//! Each proposal costs one step and comes back as an unknown-tool failure
//! the model can see. After the third step the run fails with
//! `StepBudgetExceeded`, and the report still lists every attempt.

use std::sync::Arc;

use serde_json::json;

use maestro_contracts::{error::MaestroResult, run::RunFailure, step::Action, task::Task};
use maestro_core::AgentDescriptor;
use maestro_model::ScriptedModel;

use super::{executor, print_journal, print_report};
use crate::mock_data::seeded_sql_tool;

pub async fn run_scenario() -> MaestroResult<()> {
    println!("=== Scenario: Step budget exhaustion ===");
    println!();

    let (executor, journal) = executor();

    let model = ScriptedModel::repeating(Action::tool_call("X", json!({}))).with_id("scripted-confused");
    let agent = AgentDescriptor::builder("query_analyzer", Arc::new(model))
        .tool(Arc::new(seeded_sql_tool().await?))?
        .step_budget(3)
        .build()?;

    println!("  Step budget: {}", agent.step_budget());
    println!("  Model proposes: X (not registered)");
    println!();

    let report = executor.run(&agent, Task::new("How many users are on the pro plan?")).await;

    print_report(&report);
    print_journal(&journal, &report);

    match report.failure() {
        Some(RunFailure::StepBudgetExceeded { budget }) => {
            println!("  Outcome: StepBudgetExceeded after {budget} step(s), as expected.");
        }
        other => println!("  Unexpected outcome: {:?}", other),
    }
    println!();
    println!("  Budget scenario complete.");
    println!();

    Ok(())
}
