//! Name-indexed tool lookup for one agent.
//!
//! A registry is filled while an agent is being built and then moved into
//! the `AgentDescriptor`, which only exposes it by shared reference. There is
//! no unregister: a run's tool set cannot change underneath it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    tool::ToolDescriptor,
};

use crate::traits::Tool;

/// Mapping from tool name to tool.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool.
    ///
    /// # Errors
    ///
    /// - `MaestroError::Validation` if the tool's descriptor is malformed.
    /// - `MaestroError::DuplicateName` if the name is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> MaestroResult<()> {
        let descriptor = tool.descriptor();
        descriptor.check()?;

        let name = descriptor.name.clone();
        if self.tools.contains_key(&name) {
            return Err(MaestroError::DuplicateName { name });
        }

        debug!(tool = %name, params = descriptor.inputs.len(), "tool registered");
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by name.
    ///
    /// # Errors
    ///
    /// `MaestroError::UnknownTool` if no tool has that name.
    pub fn resolve(&self, name: &str) -> MaestroResult<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| MaestroError::UnknownTool { name: name.to_string() })
    }

    /// Descriptors of every registered tool, ordered by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|t| t.descriptor().clone()).collect()
    }

    /// Names of every registered tool, ordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
