//! The tools a team configuration may refer to by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use maestro_contracts::error::{MaestroError, MaestroResult};
use maestro_core::traits::Tool;

/// Named tool instances shared by every agent that lists them.
///
/// Two agents naming the same tool share one instance (and so one pool or
/// HTTP client).
#[derive(Default, Clone)]
pub struct ToolCatalog {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under its descriptor name.
    ///
    /// # Errors
    ///
    /// - `MaestroError::Validation` if the descriptor is malformed.
    /// - `MaestroError::DuplicateName` if the name is already in the catalog.
    pub fn insert(&mut self, tool: Arc<dyn Tool>) -> MaestroResult<()> {
        let descriptor = tool.descriptor();
        descriptor.check()?;
        let name = descriptor.name.clone();
        if self.tools.contains_key(&name) {
            return Err(MaestroError::DuplicateName { name });
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, tool: Arc<dyn Tool>) -> MaestroResult<Self> {
        self.insert(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }
}
