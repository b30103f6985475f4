//! Task and identity types.
//!
//! A `Task` is what a caller hands an agent. It is moved into the run and
//! never mutated afterwards; the runtime only ever lends it out by reference.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable, human-readable name of an agent (e.g. "query_analyzer").
///
/// Also used as the tool name when the agent is managed by another agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentName(pub String);

impl AgentName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a single run of an agent against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub uuid::Uuid);

impl RunId {
    /// Create a new, unique run ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// An instruction for an agent plus optional structured context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// The natural-language instruction.
    pub instruction: String,
    /// Arbitrary structured context. `Null` when absent.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl Task {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            context: serde_json::Value::Null,
        }
    }

    /// Attach structured context to the task.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    /// Append an extra guidance paragraph to the instruction.
    pub fn with_guidance(mut self, guidance: &str) -> Self {
        let guidance = guidance.trim();
        if !guidance.is_empty() {
            self.instruction.push_str("\n\n");
            self.instruction.push_str(guidance);
        }
        self
    }
}
