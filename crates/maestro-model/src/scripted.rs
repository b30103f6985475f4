//! A deterministic model that replays a fixed script.
//!
//! Used by tests and the demo binary. Given the same script, every run makes
//! the same proposals in the same order.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    planning::PlanningRequest,
    step::Action,
};
use maestro_core::traits::LanguageModel;

/// Replays `script` in order, then `fallback` forever (if set).
pub struct ScriptedModel {
    id: String,
    script: Mutex<VecDeque<Action>>,
    fallback: Option<Action>,
}

impl ScriptedModel {
    /// Replay `actions` once. Planning past the end is a failed step.
    pub fn new(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            id: "scripted".to_string(),
            script: Mutex::new(actions.into_iter().collect()),
            fallback: None,
        }
    }

    /// Propose `action` on every planning call.
    pub fn repeating(action: Action) -> Self {
        Self::new(Vec::new()).then_repeat(action)
    }

    /// After the script runs out, keep proposing `action`.
    pub fn then_repeat(mut self, action: Action) -> Self {
        self.fallback = Some(action);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Actions left before the fallback takes over.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn plan(&self, request: &PlanningRequest) -> MaestroResult<Action> {
        let next = self
            .script
            .lock()
            .map_err(|e| MaestroError::execution(format!("script lock poisoned: {e}")))?
            .pop_front();

        debug!(agent = %request.agent, history = request.history.len(), scripted = next.is_some(), "scripted plan");

        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| MaestroError::validation("scripted model has no actions left"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use maestro_contracts::{
        planning::PlanningRequest,
        step::Action,
        task::{AgentName, Task},
    };
    use maestro_core::traits::LanguageModel;

    use super::ScriptedModel;

    fn request() -> PlanningRequest {
        PlanningRequest {
            agent: AgentName::new("a"),
            instructions: None,
            task: Task::new("t"),
            tools: vec![],
            authorized_imports: vec![],
            history: vec![],
        }
    }

    #[tokio::test]
    async fn replays_in_order_then_repeats() {
        let model = ScriptedModel::new([Action::tool_call("a", json!({})), Action::tool_call("b", json!({}))])
            .then_repeat(Action::final_answer("done"));

        assert_eq!(model.plan(&request()).await.unwrap(), Action::tool_call("a", json!({})));
        assert_eq!(model.plan(&request()).await.unwrap(), Action::tool_call("b", json!({})));
        assert_eq!(model.remaining(), 0);
        assert_eq!(model.plan(&request()).await.unwrap(), Action::final_answer("done"));
        assert_eq!(model.plan(&request()).await.unwrap(), Action::final_answer("done"));
    }

    #[tokio::test]
    async fn exhausted_script_without_fallback_errors() {
        let model = ScriptedModel::new([Action::final_answer("only")]);
        assert!(model.plan(&request()).await.is_ok());
        assert!(model.plan(&request()).await.is_err());
    }
}
