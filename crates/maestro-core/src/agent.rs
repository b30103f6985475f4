//! Agent descriptors: everything the executor needs to drive one agent.
//!
//! An `AgentDescriptor` is immutable once built. It is shared between runs
//! (and between a delegate worker and its callers) through `Arc`.

use std::sync::Arc;
use std::time::Duration;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    task::AgentName,
    tool::ToolDescriptor,
};

use crate::{
    delegation::DelegateHandle,
    registry::ToolRegistry,
    traits::{LanguageModel, Tool},
};

/// Default number of steps per run.
pub const DEFAULT_STEP_BUDGET: u32 = 12;

/// Time limits applied to the two suspension points of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Upper bound on one planning call.
    pub model_timeout: Duration,
    /// Upper bound on one tool call, unless the tool declares its own.
    pub tool_timeout: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
        }
    }
}

/// A configured agent.
pub struct AgentDescriptor {
    name: AgentName,
    description: String,
    instructions: Option<String>,
    model: Arc<dyn LanguageModel>,
    registry: ToolRegistry,
    step_budget: u32,
    authorized_imports: Vec<String>,
    limits: RunLimits,
}

impl AgentDescriptor {
    pub fn builder(name: impl Into<String>, model: Arc<dyn LanguageModel>) -> AgentBuilder {
        AgentBuilder::new(name, model)
    }

    pub fn name(&self) -> &AgentName {
        &self.name
    }

    /// What this agent does. Shown to managers as the delegate tool's description.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn step_budget(&self) -> u32 {
        self.step_budget
    }

    pub fn authorized_imports(&self) -> &[String] {
        &self.authorized_imports
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    /// Descriptors advertised to the model on every planning call.
    pub fn tool_descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("name", &self.name)
            .field("model", &self.model.model_id())
            .field("tools", &self.registry.names().collect::<Vec<_>>())
            .field("step_budget", &self.step_budget)
            .finish()
    }
}

/// Builder for [`AgentDescriptor`].
///
/// Tools and managed agents go through the same registry, so a managed
/// agent whose name clashes with a tool is a `DuplicateName` error.
pub struct AgentBuilder {
    name: AgentName,
    description: String,
    instructions: Option<String>,
    model: Arc<dyn LanguageModel>,
    registry: ToolRegistry,
    step_budget: u32,
    authorized_imports: Vec<String>,
    limits: RunLimits,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            name: AgentName::new(name),
            description: String::new(),
            instructions: None,
            model,
            registry: ToolRegistry::new(),
            step_budget: DEFAULT_STEP_BUDGET,
            authorized_imports: Vec::new(),
            limits: RunLimits::default(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn step_budget(mut self, budget: u32) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn authorized_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorized_imports = imports.into_iter().map(Into::into).collect();
        self
    }

    pub fn limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Give the agent a tool.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::register`].
    pub fn tool(mut self, tool: Arc<dyn Tool>) -> MaestroResult<Self> {
        self.registry.register(tool)?;
        Ok(self)
    }

    /// Let the agent delegate to another agent through its worker handle.
    ///
    /// # Errors
    ///
    /// See [`ToolRegistry::register`].
    pub fn manage(self, delegate: DelegateHandle) -> MaestroResult<Self> {
        self.tool(Arc::new(delegate.into_tool()))
    }

    /// # Errors
    ///
    /// `MaestroError::Config` if the step budget is zero.
    pub fn build(self) -> MaestroResult<AgentDescriptor> {
        if self.step_budget == 0 {
            return Err(MaestroError::config(format!(
                "agent '{}': step budget must be at least 1",
                self.name
            )));
        }

        Ok(AgentDescriptor {
            name: self.name,
            description: self.description,
            instructions: self.instructions,
            model: self.model,
            registry: self.registry,
            step_budget: self.step_budget,
            authorized_imports: self.authorized_imports,
            limits: self.limits,
        })
    }
}
