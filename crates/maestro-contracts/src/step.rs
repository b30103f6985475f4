//! Actions proposed by the model and the steps they produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::result::ToolResult;

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Invoke the named tool (or managed agent) with these arguments.
    ToolCall {
        tool: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    /// Stop and return this answer to the caller.
    FinalAnswer { answer: String },
}

impl Action {
    /// Build a tool call from a JSON object of arguments.
    ///
    /// Non-object values produce an empty argument map.
    pub fn tool_call(tool: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::ToolCall {
            tool: tool.into(),
            arguments,
        }
    }

    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self::FinalAnswer {
            answer: answer.into(),
        }
    }
}

/// One plan → act → observe iteration of a run.
///
/// - tool step: `action` is a `ToolCall` and `observation` holds its result;
/// - final step: `action` is a `FinalAnswer` and there is no observation;
/// - failed planning (timeout, malformed proposal): no action, and a failed
///   observation explaining what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Zero-based position within the run.
    pub index: u32,
    pub action: Option<Action>,
    pub observation: Option<ToolResult>,
}

impl Step {
    /// Return true if this step carries a failed observation.
    pub fn is_failure(&self) -> bool {
        self.observation
            .as_ref()
            .is_some_and(|o| !o.is_success())
    }

    /// The tool this step invoked, if any.
    pub fn tool_name(&self) -> Option<&str> {
        match &self.action {
            Some(Action::ToolCall { tool, .. }) => Some(tool),
            _ => None,
        }
    }
}
