//! The request sent across the model boundary on every Planning phase.

use serde::{Deserialize, Serialize};

use crate::{
    step::Step,
    task::{AgentName, Task},
    tool::ToolDescriptor,
};

/// Everything a language model needs to choose the next action.
///
/// Built by the executor from the agent descriptor and the run's history.
/// The history is complete: each decision may depend on every prior
/// observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningRequest {
    pub agent: AgentName,
    /// Agent-specific system instructions, if configured.
    pub instructions: Option<String>,
    pub task: Task,
    /// Descriptors of every tool (and managed agent) the agent may call.
    pub tools: Vec<ToolDescriptor>,
    /// Modules the agent is allowed to import in code it writes.
    pub authorized_imports: Vec<String>,
    /// All steps taken so far, in order.
    pub history: Vec<Step>,
}
