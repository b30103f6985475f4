//! Team configuration schema.
//!
//! A `TeamConfig` is deserialized from TOML: one `[defaults]` table and an
//! ordered `[[agents]]` array. Per-agent fields left out fall back to the
//! defaults.
//!
//! ```toml
//! [defaults]
//! model_id = "claude-3-5-sonnet-latest"
//! step_budget = 12
//!
//! [[agents]]
//! name = "query_analyzer"
//! description = "Analyzes user queries and retrieves data from the database."
//! tools = ["sql_query"]
//!
//! [[agents]]
//! name = "orchestrator"
//! managed_agents = ["query_analyzer"]
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use maestro_core::{agent::DEFAULT_STEP_BUDGET, RunLimits};

pub const DEFAULT_MODEL_ID: &str = "claude-3-5-sonnet-latest";

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_step_budget() -> u32 {
    DEFAULT_STEP_BUDGET
}

fn default_model_timeout() -> u64 {
    120
}

fn default_tool_timeout() -> u64 {
    60
}

fn default_delegation_timeout() -> u64 {
    600
}

/// Values every agent inherits unless it overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_step_budget")]
    pub step_budget: u32,

    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// How long a manager waits for a managed agent's whole sub-run.
    #[serde(default = "default_delegation_timeout")]
    pub delegation_timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Modules code written by agents may import.
    #[serde(default)]
    pub authorized_imports: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            step_budget: default_step_budget(),
            model_timeout_secs: default_model_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            delegation_timeout_secs: default_delegation_timeout(),
            temperature: None,
            authorized_imports: Vec::new(),
        }
    }
}

/// One agent of the team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Unique within the team. Managers see it as a tool name.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// System instructions handed to the model.
    #[serde(default)]
    pub instructions: Option<String>,

    #[serde(default)]
    pub model_id: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Names looked up in the `ToolCatalog`.
    #[serde(default)]
    pub tools: Vec<String>,

    /// Agents this one may delegate to.
    #[serde(default)]
    pub managed_agents: Vec<String>,

    #[serde(default)]
    pub step_budget: Option<u32>,

    #[serde(default)]
    pub model_timeout_secs: Option<u64>,

    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,

    /// Replaces (does not extend) the default list.
    #[serde(default)]
    pub authorized_imports: Option<Vec<String>>,
}

/// The top-level structure deserialized from a team TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamConfig {
    #[serde(default)]
    pub defaults: Defaults,

    /// The agent that receives operator tasks. When absent, the single agent
    /// no one manages is the entry.
    #[serde(default)]
    pub entry: Option<String>,

    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

/// An agent's settings with defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAgent<'a> {
    pub config: &'a AgentConfig,
    pub model_id: &'a str,
    pub temperature: Option<f32>,
    pub step_budget: u32,
    pub limits: RunLimits,
    pub authorized_imports: &'a [String],
}

impl TeamConfig {
    pub fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn delegation_timeout(&self) -> Duration {
        Duration::from_secs(self.defaults.delegation_timeout_secs)
    }

    /// Merge an agent's overrides with the team defaults.
    pub fn resolve<'a>(&'a self, agent: &'a AgentConfig) -> ResolvedAgent<'a> {
        let d = &self.defaults;
        ResolvedAgent {
            config: agent,
            model_id: agent.model_id.as_deref().unwrap_or(&d.model_id),
            temperature: agent.temperature.or(d.temperature),
            step_budget: agent.step_budget.unwrap_or(d.step_budget),
            limits: RunLimits {
                model_timeout: Duration::from_secs(agent.model_timeout_secs.unwrap_or(d.model_timeout_secs)),
                tool_timeout: Duration::from_secs(agent.tool_timeout_secs.unwrap_or(d.tool_timeout_secs)),
            },
            authorized_imports: agent.authorized_imports.as_deref().unwrap_or(&d.authorized_imports),
        }
    }
}
