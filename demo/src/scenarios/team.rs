//! Scenario: a configured team against the Anthropic API.
//!
//! Loads a team TOML (the bundled `team.toml` unless another file is given),
//! builds every agent through `TeamBuilder`, and runs one task on the entry
//! agent. Web tools join the catalog only when their API keys are supplied.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use maestro_config::{ResolvedAgent, TeamBuilder, TeamConfig, ToolCatalog};
use maestro_contracts::{error::MaestroResult, task::Task};
use maestro_core::traits::LanguageModel;
use maestro_model::AnthropicModel;
use maestro_tools::{
    DocumentQueryTool, GoogleSearchTool, JinaRerankTool, PythonFileCreatorTool, SerperScrapeTool, SqlQueryTool,
};

use super::{executor, print_journal, print_report};
use crate::mock_data::{seeded_document_store, seeded_sql_tool};

/// The team file shipped with the demo.
const BUNDLED_TEAM: &str = include_str!("../../team.toml");

/// Guidance appended to every operator task.
const REPORT_GUIDANCE: &str = "When figures are involved, include them in the final answer \
                               and name the table or collection they came from.";

pub struct TeamOptions {
    pub config: Option<PathBuf>,
    pub api_key: String,
    pub database_url: Option<String>,
    pub serper_key: Option<String>,
    pub jina_key: Option<String>,
    pub output_dir: PathBuf,
    pub task: String,
}

async fn catalog(options: &TeamOptions) -> MaestroResult<ToolCatalog> {
    let sql = match &options.database_url {
        Some(url) => SqlQueryTool::connect_lazy(url)?,
        None => seeded_sql_tool().await?,
    };

    let mut catalog = ToolCatalog::new()
        .with(Arc::new(sql))?
        .with(Arc::new(DocumentQueryTool::new(Arc::new(seeded_document_store()))))?
        .with(Arc::new(PythonFileCreatorTool::new(&options.output_dir)))?;

    if let Some(key) = &options.serper_key {
        catalog.insert(Arc::new(GoogleSearchTool::new(key)))?;
        catalog.insert(Arc::new(SerperScrapeTool::new(key)))?;
    }
    if let Some(key) = &options.jina_key {
        catalog.insert(Arc::new(JinaRerankTool::new(key)))?;
    }
    Ok(catalog)
}

fn load_config(path: Option<&Path>) -> MaestroResult<TeamConfig> {
    match path {
        Some(path) => TeamConfig::from_file(path),
        None => TeamConfig::from_toml_str(BUNDLED_TEAM),
    }
}

pub async fn run_scenario(options: TeamOptions) -> MaestroResult<()> {
    println!("=== Scenario: Configured team (Anthropic) ===");
    println!();

    let config = load_config(options.config.as_deref())?;
    let catalog = catalog(&options).await?;
    println!("  Tool catalog: {:?}", catalog.names().collect::<Vec<_>>());

    let api_key = options.api_key.clone();
    let models = move |agent: &ResolvedAgent<'_>| -> MaestroResult<Arc<dyn LanguageModel>> {
        let mut model = AnthropicModel::new(api_key.clone(), agent.model_id);
        if let Some(temperature) = agent.temperature {
            model = model.with_temperature(temperature);
        }
        Ok(Arc::new(model))
    };

    let (executor, journal) = executor();
    let team = TeamBuilder::new(&config, &catalog, &models, executor).build()?;
    println!("  Agents: {:?} (entry: {})", team.agent_names().collect::<Vec<_>>(), team.entry());
    println!();

    info!(entry = %team.entry(), "submitting task");
    let report = team.run(Task::new(options.task).with_guidance(REPORT_GUIDANCE)).await?;

    print_report(&report);
    print_journal(&journal, &report);
    println!("  Team scenario complete.");
    println!();

    Ok(())
}
