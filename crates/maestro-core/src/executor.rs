//! The maestro executor: the step-bounded agent loop.
//!
//! Every run walks the same state machine:
//!
//!   Planning → Acting → Observing → (Planning | Done | Failed)
//!
//! The step budget is checked before every Planning phase, so a run never
//! holds more steps than its agent's budget. Tool failures of any kind
//! (unknown name, rejected arguments, execution error, timeout) become
//! failed observations the model gets to see on its next planning call.
//! Only an exhausted budget, an unavailable model, or cancellation end a
//! run without an answer.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use maestro_contracts::{
    error::MaestroError,
    planning::PlanningRequest,
    result::ToolResult,
    run::{RunFailure, RunOutcome, RunReport, RunState},
    step::{Action, Step},
    task::{AgentName, RunId, Task},
};

use crate::{
    agent::AgentDescriptor,
    invoke::invoke,
    traits::{ArgumentValidator, StepJournal, ToolContext},
};

/// Drives runs of any agent against the shared validator and journal.
///
/// One executor serves every run in a process; it holds no per-run state.
pub struct Executor {
    validator: Arc<dyn ArgumentValidator>,
    journal: Arc<dyn StepJournal>,
}

impl Executor {
    pub fn new(validator: Arc<dyn ArgumentValidator>, journal: Arc<dyn StepJournal>) -> Self {
        Self { validator, journal }
    }

    /// Run `agent` against `task` until it answers or fails.
    pub async fn run(&self, agent: &AgentDescriptor, task: Task) -> RunReport {
        self.run_with_cancel(agent, task, CancellationToken::new()).await
    }

    /// Run `agent` against `task`, stopping early once `cancel` fires.
    ///
    /// Cancellation is observed before each Planning and each Acting phase.
    /// A tool call already in flight is allowed to finish and its step is
    /// kept in the report.
    pub async fn run_with_cancel(&self, agent: &AgentDescriptor, task: Task, cancel: CancellationToken) -> RunReport {
        let run_id = RunId::new();
        let budget = agent.step_budget();
        let limits = agent.limits();
        let tools = agent.tool_descriptors();
        let mut steps: Vec<Step> = Vec::new();

        info!(
            run_id = %run_id,
            agent = %agent.name(),
            model = agent.model().model_id(),
            budget,
            "run started"
        );

        let outcome = loop {
            // ── Budget and cancellation gate ─────────────────────────────────
            if steps.len() as u32 >= budget {
                warn!(run_id = %run_id, agent = %agent.name(), budget, "step budget exhausted");
                break RunOutcome::Failed {
                    failure: RunFailure::StepBudgetExceeded { budget },
                };
            }
            if cancel.is_cancelled() {
                break cancelled(&run_id, RunState::Planning);
            }

            // ── Planning ─────────────────────────────────────────────────────
            let step_index = steps.len() as u32;
            debug!(run_id = %run_id, step = step_index, state = %RunState::Planning, "requesting next action");

            let request = PlanningRequest {
                agent: agent.name().clone(),
                instructions: agent.instructions().map(str::to_string),
                task: task.clone(),
                tools: tools.clone(),
                authorized_imports: agent.authorized_imports().to_vec(),
                history: steps.clone(),
            };

            let planned = tokio::time::timeout(limits.model_timeout, agent.model().plan(&request)).await;
            let action = match planned {
                Ok(Ok(action)) => action,
                Ok(Err(MaestroError::ModelUnavailable { reason })) => {
                    warn!(run_id = %run_id, step = step_index, reason = %reason, "model unavailable, run failed");
                    break RunOutcome::Failed {
                        failure: RunFailure::ModelUnavailable { reason },
                    };
                }
                Ok(Err(MaestroError::Cancelled)) => break cancelled(&run_id, RunState::Planning),
                Ok(Err(err)) => {
                    warn!(run_id = %run_id, step = step_index, error = %err, "planning failed");
                    self.append(&run_id, agent.name(), &mut steps, None, Some(ToolResult::failure(err.to_string())));
                    continue;
                }
                Err(_) => {
                    let err = timed_out("model call", limits.model_timeout);
                    warn!(run_id = %run_id, step = step_index, error = %err, "planning timed out");
                    self.append(&run_id, agent.name(), &mut steps, None, Some(ToolResult::failure(err.to_string())));
                    continue;
                }
            };

            let (tool_name, arguments) = match action {
                Action::FinalAnswer { answer } => {
                    debug!(run_id = %run_id, step = step_index, state = %RunState::Done, "final answer proposed");
                    self.append(
                        &run_id,
                        agent.name(),
                        &mut steps,
                        Some(Action::final_answer(answer.clone())),
                        None,
                    );
                    break RunOutcome::Done { answer };
                }
                Action::ToolCall { tool, arguments } => (tool, arguments),
            };

            // ── Acting ───────────────────────────────────────────────────────
            if cancel.is_cancelled() {
                break cancelled(&run_id, RunState::Acting);
            }
            debug!(run_id = %run_id, step = step_index, state = %RunState::Acting, tool = %tool_name, "invoking tool");

            let ctx = ToolContext {
                run_id,
                agent: agent.name().clone(),
                cancel: cancel.clone(),
            };
            let observation = self.act(agent, &ctx, &tool_name, arguments.clone()).await;

            // ── Observing ────────────────────────────────────────────────────
            debug!(
                run_id = %run_id,
                step = step_index,
                state = %RunState::Observing,
                tool = %tool_name,
                success = observation.is_success(),
                "observation recorded"
            );
            self.append(
                &run_id,
                agent.name(),
                &mut steps,
                Some(Action::ToolCall { tool: tool_name, arguments }),
                Some(observation),
            );
        };

        let report = RunReport {
            run_id,
            agent: agent.name().clone(),
            task,
            steps,
            outcome,
        };

        match &report.outcome {
            RunOutcome::Done { .. } => {
                info!(run_id = %run_id, agent = %report.agent, steps = report.steps.len(), "run done")
            }
            RunOutcome::Failed { failure } => {
                info!(run_id = %run_id, agent = %report.agent, steps = report.steps.len(), failure = %failure, "run failed")
            }
        }

        if let Err(err) = self.journal.seal(&report) {
            warn!(run_id = %run_id, error = %err, "journal seal failed");
        }

        report
    }

    /// Resolve and invoke one tool call, always yielding an observation.
    async fn act(
        &self,
        agent: &AgentDescriptor,
        ctx: &ToolContext,
        tool_name: &str,
        arguments: Map<String, Value>,
    ) -> ToolResult {
        let tool = match agent.registry().resolve(tool_name) {
            Ok(tool) => tool,
            Err(err) => {
                warn!(run_id = %ctx.run_id, tool = %tool_name, "model proposed an unknown tool");
                return ToolResult::failure(err.to_string());
            }
        };

        let limit = tool.timeout().unwrap_or(agent.limits().tool_timeout);
        match tokio::time::timeout(limit, invoke(tool.as_ref(), self.validator.as_ref(), arguments, ctx)).await {
            Ok(result) => result,
            Err(_) => {
                let err = timed_out(&format!("tool '{tool_name}'"), limit);
                warn!(run_id = %ctx.run_id, tool = %tool_name, error = %err, "tool call timed out");
                ToolResult::failure(err.to_string())
            }
        }
    }

    /// Append a step to the run and journal it.
    ///
    /// Journal failures are logged; the step stays in the report either way.
    fn append(
        &self,
        run_id: &RunId,
        agent: &AgentName,
        steps: &mut Vec<Step>,
        action: Option<Action>,
        observation: Option<ToolResult>,
    ) {
        let step = Step {
            index: steps.len() as u32,
            action,
            observation,
        };
        if let Err(err) = self.journal.record(run_id, agent, &step) {
            warn!(run_id = %run_id, step = step.index, error = %err, "journal write failed");
        }
        steps.push(step);
    }
}

fn cancelled(run_id: &RunId, state: RunState) -> RunOutcome {
    info!(run_id = %run_id, state = %state, "run cancelled");
    RunOutcome::Failed {
        failure: RunFailure::Cancelled,
    }
}

fn timed_out(operation: &str, limit: Duration) -> MaestroError {
    MaestroError::Timeout {
        operation: operation.to_string(),
        seconds: limit.as_secs(),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
