//! # maestro-config
//!
//! TOML team configuration for the maestro runtime.
//!
//! ## Overview
//!
//! A team file declares agents, their tools (by catalog name) and which
//! agents each one may delegate to. [`TeamBuilder`] checks the file against
//! a [`ToolCatalog`], builds agents bottom-up, gives every managed agent a
//! delegate worker, and returns a [`Team`] ready to take tasks.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use maestro_config::{TeamBuilder, TeamConfig, ToolCatalog};
//!
//! let config = TeamConfig::from_file(Path::new("team.toml"))?;
//! let catalog = ToolCatalog::new().with(Arc::new(sql_tool))?;
//! let team = TeamBuilder::new(&config, &catalog, &models, executor).build()?;
//! let report = team.run(Task::new("Summarise Q3 revenue")).await?;
//! ```

pub mod catalog;
pub mod schema;
pub mod team;
pub mod validate;

use std::path::Path;

use maestro_contracts::error::{MaestroError, MaestroResult};

pub use catalog::ToolCatalog;
pub use schema::{AgentConfig, Defaults, ResolvedAgent, TeamConfig, DEFAULT_MODEL_ID};
pub use team::{ModelFactory, Team, TeamBuilder};

impl TeamConfig {
    /// Parse `s` as a team TOML document.
    ///
    /// Returns `MaestroError::Config` if the TOML is malformed or does not
    /// match the `TeamConfig` schema. Semantic checks happen in
    /// [`TeamConfig::validate`].
    pub fn from_toml_str(s: &str) -> MaestroResult<Self> {
        toml::from_str(s).map_err(|e| MaestroError::config(format!("failed to parse team TOML: {e}")))
    }

    /// Read and parse the team file at `path`.
    pub fn from_file(path: &Path) -> MaestroResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MaestroError::config(format!("failed to read team file '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};

    use maestro_contracts::{
        error::{MaestroError, MaestroResult},
        result::ToolResult,
        step::Action,
        task::Task,
        tool::{ParamSpec, ParamType, ToolDescriptor},
    };
    use maestro_core::{
        traits::{LanguageModel, Tool, ToolContext},
        Executor,
    };
    use maestro_journal::InMemoryJournal;
    use maestro_model::ScriptedModel;
    use maestro_verify::SchemaValidator;

    use crate::{ResolvedAgent, TeamBuilder, TeamConfig, ToolCatalog};

    // ── Helpers ───────────────────────────────────────────────────────────────

    const TEAM: &str = r#"
        [defaults]
        model_id = "claude-3-5-sonnet-latest"
        step_budget = 12
        model_timeout_secs = 120
        tool_timeout_secs = 60
        authorized_imports = ["pandas", "numpy"]

        [[agents]]
        name = "orchestrator"
        description = "Orchestrates the other agents."
        managed_agents = ["query_analyzer", "report_generator"]
        instructions = "Delegate data questions, then ask for a report."

        [[agents]]
        name = "query_analyzer"
        description = "Analyzes user queries and retrieves data from the database."
        tools = ["sql_query"]
        temperature = 0.6
        step_budget = 6

        [[agents]]
        name = "report_generator"
        description = "Writes business reports."
        authorized_imports = []
    "#;

    struct RowCountTool {
        descriptor: ToolDescriptor,
    }

    impl RowCountTool {
        fn new() -> Self {
            Self {
                descriptor: ToolDescriptor::new("sql_query", "Runs SQL")
                    .param("query", ParamSpec::required(ParamType::String, "statement")),
            }
        }
    }

    #[async_trait]
    impl Tool for RowCountTool {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _arguments: Map<String, Value>, _ctx: &ToolContext) -> MaestroResult<ToolResult> {
            Ok(ToolResult::ok_with_count(json!([{ "n": 42 }]), 1))
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::new().with(Arc::new(RowCountTool::new())).unwrap()
    }

    fn executor() -> Arc<Executor> {
        Arc::new(Executor::new(Arc::new(SchemaValidator::new()), Arc::new(InMemoryJournal::new())))
    }

    fn expect_config_error(toml: &str, needle: &str) {
        let config = TeamConfig::from_toml_str(toml).unwrap();
        match config.validate(&catalog()) {
            Err(MaestroError::Config { reason }) => {
                assert!(reason.contains(needle), "expected '{needle}' in: {reason}")
            }
            other => panic!("expected Config error containing '{needle}', got {:?}", other),
        }
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn parses_team_and_resolves_defaults() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        assert_eq!(config.agents.len(), 3);

        let analyzer = config.agent("query_analyzer").unwrap();
        let resolved = config.resolve(analyzer);
        assert_eq!(resolved.model_id, "claude-3-5-sonnet-latest");
        assert_eq!(resolved.step_budget, 6);
        assert_eq!(resolved.temperature, Some(0.6));
        assert_eq!(resolved.limits.tool_timeout, Duration::from_secs(60));
        assert_eq!(resolved.authorized_imports, ["pandas".to_string(), "numpy".to_string()]);

        let reporter = config.resolve(config.agent("report_generator").unwrap());
        assert!(reporter.authorized_imports.is_empty(), "an explicit list replaces the default");
        assert_eq!(reporter.step_budget, 12);
    }

    #[test]
    fn empty_defaults_table_uses_built_in_values() {
        let config = TeamConfig::from_toml_str("[[agents]]\nname = \"solo\"\n").unwrap();
        let resolved = config.resolve(&config.agents[0]);
        assert_eq!(resolved.step_budget, 12);
        assert_eq!(resolved.limits.model_timeout, Duration::from_secs(120));
        assert_eq!(config.delegation_timeout(), Duration::from_secs(600));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(
            TeamConfig::from_toml_str("[[agents]\nname ="),
            Err(MaestroError::Config { .. })
        ));
        assert!(matches!(
            TeamConfig::from_toml_str("[[agents]]\nname = \"a\"\nunknown_key = 1\n"),
            Err(MaestroError::Config { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = TeamConfig::from_file(std::path::Path::new("/nonexistent/team.toml"));
        assert!(matches!(result, Err(MaestroError::Config { .. })));
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn sample_team_validates() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        config.validate(&catalog()).unwrap();
        assert_eq!(config.entry_agent().unwrap().name, "orchestrator");
    }

    #[test]
    fn build_order_puts_managed_agents_first() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        let order: Vec<&str> = config.build_order().unwrap().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(order, vec!["query_analyzer", "report_generator", "orchestrator"]);
    }

    #[test]
    fn rejects_duplicate_agent_names() {
        expect_config_error("[[agents]]\nname = \"a\"\n[[agents]]\nname = \"a\"\n", "defined twice");
    }

    #[test]
    fn rejects_unknown_tool() {
        expect_config_error("[[agents]]\nname = \"a\"\ntools = [\"web_search\"]\n", "unknown tool 'web_search'");
    }

    #[test]
    fn rejects_unknown_managed_agent() {
        expect_config_error("[[agents]]\nname = \"a\"\nmanaged_agents = [\"ghost\"]\n", "unknown agent 'ghost'");
    }

    #[test]
    fn rejects_zero_budget() {
        expect_config_error("[[agents]]\nname = \"a\"\nstep_budget = 0\n", "step_budget");
        expect_config_error("[defaults]\nstep_budget = 0\n[[agents]]\nname = \"a\"\n", "step_budget");
    }

    #[test]
    fn rejects_out_of_range_temperature() {
        expect_config_error("[[agents]]\nname = \"a\"\ntemperature = 1.5\n", "temperature");
    }

    #[test]
    fn rejects_delegation_cycles() {
        expect_config_error(
            r#"
            entry = "a"
            [[agents]]
            name = "a"
            managed_agents = ["b"]
            [[agents]]
            name = "b"
            managed_agents = ["c"]
            [[agents]]
            name = "c"
            managed_agents = ["a"]
            "#,
            "delegation cycle: a -> b -> c -> a",
        );
        expect_config_error(
            "entry = \"a\"\n[[agents]]\nname = \"a\"\nmanaged_agents = [\"a\"]\n",
            "delegation cycle: a -> a",
        );
    }

    #[test]
    fn rejects_tool_and_agent_with_same_name() {
        expect_config_error(
            r#"
            [[agents]]
            name = "boss"
            tools = ["sql_query"]
            managed_agents = ["sql_query"]
            [[agents]]
            name = "sql_query"
            "#,
            "listed twice",
        );
    }

    #[test]
    fn rejects_ambiguous_entry() {
        expect_config_error("[[agents]]\nname = \"a\"\n[[agents]]\nname = \"b\"\n", "ambiguous entry");
        expect_config_error("entry = \"zed\"\n[[agents]]\nname = \"a\"\n", "'zed' is not defined");
    }

    #[test]
    fn rejects_empty_team() {
        expect_config_error("", "no agents");
    }

    // ── Building ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn built_team_delegates_end_to_end() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        let catalog = catalog();
        let factory = |agent: &ResolvedAgent<'_>| -> MaestroResult<Arc<dyn LanguageModel>> {
            let script = match agent.config.name.as_str() {
                "orchestrator" => vec![
                    Action::tool_call("query_analyzer", json!({ "task": "count users" })),
                    Action::tool_call("report_generator", json!({ "task": "write it up", "additional_args": { "n": 42 } })),
                    Action::final_answer("Report delivered: 42 users."),
                ],
                "query_analyzer" => vec![
                    Action::tool_call("sql_query", json!({ "query": "SELECT count(*) AS n FROM users" })),
                    Action::final_answer("42"),
                ],
                _ => vec![Action::final_answer("There are 42 users.")],
            };
            Ok(Arc::new(ScriptedModel::new(script).with_id(agent.model_id)))
        };

        let team = TeamBuilder::new(&config, &catalog, &factory, executor()).build().unwrap();
        assert_eq!(team.entry().as_str(), "orchestrator");

        let orchestrator = team.agent("orchestrator").unwrap();
        let tools: Vec<&str> = orchestrator.registry().names().collect();
        assert_eq!(tools, vec!["query_analyzer", "report_generator"]);
        assert_eq!(team.agent("query_analyzer").unwrap().step_budget(), 6);

        let report = team.run(Task::new("How many users do we have?")).await.unwrap();
        assert_eq!(report.answer(), Some("Report delivered: 42 users."));
        assert_eq!(report.steps.len(), 3, "each sub-run is one manager step");

        let first = report.steps[0].observation.as_ref().unwrap();
        assert_eq!(first.data().unwrap()["answer"], "42");
        assert_eq!(first.data().unwrap()["steps"], 2);
    }

    #[tokio::test]
    async fn run_agent_reaches_managed_agents_directly() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        let catalog = catalog();
        let factory = |_agent: &ResolvedAgent<'_>| -> MaestroResult<Arc<dyn LanguageModel>> {
            Ok(Arc::new(ScriptedModel::repeating(Action::final_answer("ok"))))
        };
        let team = TeamBuilder::new(&config, &catalog, &factory, executor()).build().unwrap();

        let report = team
            .run_agent("report_generator", Task::new("t"), Default::default())
            .await
            .unwrap();
        assert!(report.is_done());

        assert!(matches!(
            team.run_agent("ghost", Task::new("t"), Default::default()).await,
            Err(MaestroError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn factory_errors_abort_the_build() {
        let config = TeamConfig::from_toml_str(TEAM).unwrap();
        let catalog = catalog();
        let factory = |agent: &ResolvedAgent<'_>| -> MaestroResult<Arc<dyn LanguageModel>> {
            Err(MaestroError::config(format!("no credentials for {}", agent.model_id)))
        };

        match TeamBuilder::new(&config, &catalog, &factory, executor()).build() {
            Err(MaestroError::Config { reason }) => assert!(reason.contains("no credentials")),
            Err(other) => panic!("expected Config error, got {:?}", other),
            Ok(_) => panic!("build must fail"),
        }
    }
}
