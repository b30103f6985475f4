//! Static checks on a `TeamConfig`, run before any agent is built.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use maestro_contracts::error::{MaestroError, MaestroResult};

use crate::{
    catalog::ToolCatalog,
    schema::{AgentConfig, TeamConfig},
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl TeamConfig {
    /// Check the whole configuration against the tools on offer.
    ///
    /// # Errors
    ///
    /// `MaestroError::Config` naming the first problem found: no agents, an
    /// invalid or duplicate agent name, a zero budget or timeout, a
    /// temperature outside `0.0..=1.0`, an unknown tool or managed agent, a
    /// tool and a managed agent sharing a name, a delegation cycle, or an
    /// ambiguous entry agent.
    pub fn validate(&self, catalog: &ToolCatalog) -> MaestroResult<()> {
        if self.agents.is_empty() {
            return Err(MaestroError::config("team has no agents"));
        }

        let d = &self.defaults;
        if d.step_budget == 0 {
            return Err(MaestroError::config("defaults.step_budget must be at least 1"));
        }
        for (field, secs) in [
            ("model_timeout_secs", d.model_timeout_secs),
            ("tool_timeout_secs", d.tool_timeout_secs),
            ("delegation_timeout_secs", d.delegation_timeout_secs),
        ] {
            if secs == 0 {
                return Err(MaestroError::config(format!("defaults.{field} must be at least 1")));
            }
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !valid_name(&agent.name) {
                return Err(MaestroError::config(format!(
                    "agent name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                    agent.name
                )));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(MaestroError::config(format!("agent '{}' is defined twice", agent.name)));
            }
            self.validate_agent(agent, catalog)?;
        }

        self.build_order()?;
        self.entry_agent()?;
        Ok(())
    }

    fn validate_agent(&self, agent: &AgentConfig, catalog: &ToolCatalog) -> MaestroResult<()> {
        let name = &agent.name;

        if agent.step_budget == Some(0) {
            return Err(MaestroError::config(format!("agent '{name}': step_budget must be at least 1")));
        }
        if agent.model_timeout_secs == Some(0) || agent.tool_timeout_secs == Some(0) {
            return Err(MaestroError::config(format!("agent '{name}': timeouts must be at least 1 second")));
        }
        if let Some(t) = agent.temperature.or(self.defaults.temperature) {
            if !(0.0..=1.0).contains(&t) {
                return Err(MaestroError::config(format!(
                    "agent '{name}': temperature {t} is outside 0.0..=1.0"
                )));
            }
        }

        let mut offered = HashSet::new();
        for tool in &agent.tools {
            if !catalog.contains(tool) {
                return Err(MaestroError::config(format!("agent '{name}' uses unknown tool '{tool}'")));
            }
            if !offered.insert(tool.as_str()) {
                return Err(MaestroError::config(format!("agent '{name}' lists tool '{tool}' twice")));
            }
        }
        for managed in &agent.managed_agents {
            if self.agent(managed).is_none() {
                return Err(MaestroError::config(format!("agent '{name}' manages unknown agent '{managed}'")));
            }
            if !offered.insert(managed.as_str()) {
                return Err(MaestroError::config(format!(
                    "agent '{name}': '{managed}' is listed twice among its tools and managed agents"
                )));
            }
        }
        Ok(())
    }

    /// Agents ordered so every managed agent precedes its managers.
    ///
    /// Ties keep declaration order.
    ///
    /// # Errors
    ///
    /// `MaestroError::Config` on an unknown managed agent or a delegation
    /// cycle (the message spells out the cycle).
    pub fn build_order(&self) -> MaestroResult<Vec<&AgentConfig>> {
        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();
        let mut order = Vec::with_capacity(self.agents.len());

        for agent in &self.agents {
            self.visit(agent, &mut marks, &mut path, &mut order)?;
        }

        debug!(
            order = ?order.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            "agent build order"
        );
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        agent: &'a AgentConfig,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        order: &mut Vec<&'a AgentConfig>,
    ) -> MaestroResult<()> {
        match marks.get(agent.name.as_str()) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == agent.name).unwrap_or(0);
                let mut cycle: Vec<&str> = path[start..].to_vec();
                cycle.push(&agent.name);
                return Err(MaestroError::config(format!("delegation cycle: {}", cycle.join(" -> "))));
            }
            None => {}
        }

        marks.insert(&agent.name, Mark::Visiting);
        path.push(&agent.name);

        for managed in &agent.managed_agents {
            let child = self.agent(managed).ok_or_else(|| {
                MaestroError::config(format!("agent '{}' manages unknown agent '{managed}'", agent.name))
            })?;
            self.visit(child, marks, path, order)?;
        }

        path.pop();
        marks.insert(&agent.name, Mark::Done);
        order.push(agent);
        Ok(())
    }

    /// The agent operator tasks go to.
    ///
    /// # Errors
    ///
    /// `MaestroError::Config` if `entry` names no agent, or if it is unset
    /// and there is not exactly one agent that no one manages.
    pub fn entry_agent(&self) -> MaestroResult<&AgentConfig> {
        if let Some(entry) = &self.entry {
            return self
                .agent(entry)
                .ok_or_else(|| MaestroError::config(format!("entry agent '{entry}' is not defined")));
        }

        let managed: HashSet<&str> = self
            .agents
            .iter()
            .flat_map(|a| a.managed_agents.iter().map(String::as_str))
            .collect();
        let roots: Vec<&AgentConfig> = self
            .agents
            .iter()
            .filter(|a| !managed.contains(a.name.as_str()))
            .collect();

        match roots.as_slice() {
            [single] => Ok(*single),
            [] => Err(MaestroError::config("every agent is managed by another; set 'entry'")),
            many => Err(MaestroError::config(format!(
                "ambiguous entry agent ({}); set 'entry'",
                many.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}
