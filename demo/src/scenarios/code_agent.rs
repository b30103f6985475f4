//! Scenario: the code agent writes a dashboard script.
//!
//! The first attempt tries to escape the output directory and is rejected
//! before anything is written; the second writes `dashboard.py` under the
//! demo's output directory.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use maestro_contracts::{error::MaestroResult, step::Action, task::Task};
use maestro_core::AgentDescriptor;
use maestro_model::ScriptedModel;
use maestro_tools::PythonFileCreatorTool;

use super::{executor, print_journal, print_report};

const DASHBOARD: &str = "import pandas as pd\n\n\
signups = pd.DataFrame({\"plan\": [\"pro\", \"starter\"], \"signups\": [2, 1]})\n\
print(signups.to_string(index=False))\n";

pub async fn run_scenario(output_dir: &Path) -> MaestroResult<()> {
    println!("=== Scenario: Code agent ===");
    println!();

    let (executor, journal) = executor();

    let model = ScriptedModel::new([
        Action::tool_call(
            "python_file_creator",
            json!({ "filename": "dashboard", "content": DASHBOARD, "directory": "../outside" }),
        ),
        Action::tool_call(
            "python_file_creator",
            json!({ "filename": "dashboard", "content": DASHBOARD, "directory": "dashboards" }),
        ),
        Action::final_answer("Dashboard written to dashboards/dashboard.py."),
    ])
    .with_id("scripted-coder");

    let agent = AgentDescriptor::builder("code_agent", Arc::new(model))
        .description("Generates Python dashboard code based on the report generator's analysis.")
        .authorized_imports(["pandas", "numpy"])
        .tool(Arc::new(PythonFileCreatorTool::new(output_dir)))?
        .build()?;

    println!("  Output directory: {}", output_dir.display());
    println!();

    let report = executor.run(&agent, Task::new("Create a dashboard script for May signups.")).await;

    print_report(&report);
    print_journal(&journal, &report);

    let written = output_dir.join("dashboards").join("dashboard.py");
    println!("  {} exists: {}", written.display(), written.is_file());
    println!();
    println!("  Code agent scenario complete.");
    println!();

    Ok(())
}
