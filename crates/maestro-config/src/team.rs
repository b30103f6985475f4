//! Turning a `TeamConfig` into running agents.
//!
//! `TeamBuilder` is the only place agents are assembled from configuration.
//! It builds agents in dependency order: every managed agent is built and
//! given a delegate worker before any manager that lists it. The managers
//! then receive the workers' handles as tools.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    run::RunReport,
    task::{AgentName, Task},
};
use maestro_core::{spawn_delegate, traits::LanguageModel, AgentDescriptor, DelegateHandle, Executor};

use crate::{
    catalog::ToolCatalog,
    schema::{ResolvedAgent, TeamConfig},
};

/// Creates the model behind each configured agent.
pub trait ModelFactory: Send + Sync {
    fn create(&self, agent: &ResolvedAgent<'_>) -> MaestroResult<Arc<dyn LanguageModel>>;
}

impl<F> ModelFactory for F
where
    F: Fn(&ResolvedAgent<'_>) -> MaestroResult<Arc<dyn LanguageModel>> + Send + Sync,
{
    fn create(&self, agent: &ResolvedAgent<'_>) -> MaestroResult<Arc<dyn LanguageModel>> {
        self(agent)
    }
}

/// Assembles a [`Team`] from a configuration, a tool catalog and a model
/// factory.
pub struct TeamBuilder<'a> {
    config: &'a TeamConfig,
    catalog: &'a ToolCatalog,
    models: &'a dyn ModelFactory,
    executor: Arc<Executor>,
}

impl<'a> TeamBuilder<'a> {
    pub fn new(
        config: &'a TeamConfig,
        catalog: &'a ToolCatalog,
        models: &'a dyn ModelFactory,
        executor: Arc<Executor>,
    ) -> Self {
        Self {
            config,
            catalog,
            models,
            executor,
        }
    }

    /// Validate the configuration and build every agent.
    ///
    /// Must be called from within a tokio runtime: managed agents get a
    /// worker task each.
    ///
    /// # Errors
    ///
    /// - `MaestroError::Config` for any problem [`TeamConfig::validate`] finds.
    /// - Whatever the model factory returns.
    pub fn build(self) -> MaestroResult<Team> {
        self.config.validate(self.catalog)?;

        let mut agents: BTreeMap<String, Arc<AgentDescriptor>> = BTreeMap::new();
        let mut handles: BTreeMap<String, DelegateHandle> = BTreeMap::new();
        let managed: Vec<&str> = self
            .config
            .agents
            .iter()
            .flat_map(|a| a.managed_agents.iter().map(String::as_str))
            .collect();

        for agent_config in self.config.build_order()? {
            let resolved = self.config.resolve(agent_config);
            let model = self.models.create(&resolved)?;

            let mut builder = AgentDescriptor::builder(&agent_config.name, model)
                .description(&agent_config.description)
                .step_budget(resolved.step_budget)
                .authorized_imports(resolved.authorized_imports.iter().cloned())
                .limits(resolved.limits);
            if let Some(instructions) = &agent_config.instructions {
                builder = builder.instructions(instructions);
            }

            for tool_name in &agent_config.tools {
                let tool = self.catalog.get(tool_name).ok_or_else(|| {
                    MaestroError::config(format!("agent '{}' uses unknown tool '{tool_name}'", agent_config.name))
                })?;
                builder = builder.tool(tool)?;
            }
            for managed_name in &agent_config.managed_agents {
                let handle = handles.get(managed_name).cloned().ok_or_else(|| {
                    MaestroError::config(format!(
                        "agent '{}' manages '{managed_name}', which has no worker",
                        agent_config.name
                    ))
                })?;
                builder = builder.manage(handle)?;
            }

            let agent = Arc::new(builder.build()?);
            info!(
                agent = %agent.name(),
                model = %resolved.model_id,
                tools = agent.registry().len(),
                step_budget = agent.step_budget(),
                "agent built"
            );

            if managed.contains(&agent_config.name.as_str()) {
                let handle = spawn_delegate(self.executor.clone(), agent.clone(), self.config.delegation_timeout());
                handles.insert(agent_config.name.clone(), handle);
            }
            agents.insert(agent_config.name.clone(), agent);
        }

        let entry = AgentName::new(&self.config.entry_agent()?.name);
        Ok(Team {
            agents,
            entry,
            executor: self.executor,
        })
    }
}

/// A built team: every agent by name, plus the entry agent operator tasks
/// go to.
pub struct Team {
    agents: BTreeMap<String, Arc<AgentDescriptor>>,
    entry: AgentName,
    executor: Arc<Executor>,
}

impl Team {
    pub fn entry(&self) -> &AgentName {
        &self.entry
    }

    pub fn agent(&self, name: &str) -> Option<&Arc<AgentDescriptor>> {
        self.agents.get(name)
    }

    pub fn agent_names(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Run a task on the entry agent.
    pub async fn run(&self, task: Task) -> MaestroResult<RunReport> {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    pub async fn run_with_cancel(&self, task: Task, cancel: CancellationToken) -> MaestroResult<RunReport> {
        self.run_agent(self.entry.as_str(), task, cancel).await
    }

    /// Run a task on any agent of the team directly.
    ///
    /// # Errors
    ///
    /// `MaestroError::Config` if the team has no such agent.
    pub async fn run_agent(&self, name: &str, task: Task, cancel: CancellationToken) -> MaestroResult<RunReport> {
        let agent = self
            .agents
            .get(name)
            .ok_or_else(|| MaestroError::config(format!("team has no agent '{name}'")))?;
        Ok(self.executor.run_with_cancel(agent, task, cancel).await)
    }
}
