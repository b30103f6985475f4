//! Run lifecycle and terminal reports.
//!
//! `RunState` names the phases of the agent loop. `RunReport` is what the
//! executor hands back to the caller once a run terminates, success or not.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    step::{Action, Step},
    task::{AgentName, RunId, Task},
};

/// Phases of the agent loop.
///
/// `Planning → Acting → Observing → (Planning | Done | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Planning,
    Acting,
    Observing,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Planning => "planning",
            RunState::Acting => "acting",
            RunState::Observing => "observing",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a run ended without an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    StepBudgetExceeded { budget: u32 },
    ModelUnavailable { reason: String },
    Cancelled,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunFailure::StepBudgetExceeded { budget } => {
                write!(f, "step budget of {budget} exhausted without a final answer")
            }
            RunFailure::ModelUnavailable { reason } => write!(f, "model unavailable: {reason}"),
            RunFailure::Cancelled => f.write_str("run cancelled"),
        }
    }
}

/// How a run terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Done { answer: String },
    Failed { failure: RunFailure },
}

/// The complete record of a terminated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub agent: AgentName,
    pub task: Task,
    /// Every step in order. On failure this is what was tried.
    pub steps: Vec<Step>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn is_done(&self) -> bool {
        matches!(self.outcome, RunOutcome::Done { .. })
    }

    /// The final answer, if the run completed.
    pub fn answer(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Done { answer } => Some(answer),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// The failure, if the run did not complete.
    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.outcome {
            RunOutcome::Done { .. } => None,
            RunOutcome::Failed { failure } => Some(failure),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            RunOutcome::Done { answer } => {
                writeln!(f, "run {} ({}) done after {} step(s)", self.run_id, self.agent, self.steps.len())?;
                writeln!(f, "answer: {answer}")?;
            }
            RunOutcome::Failed { failure } => {
                writeln!(f, "run {} ({}) failed after {} step(s): {failure}", self.run_id, self.agent, self.steps.len())?;
            }
        }

        for step in &self.steps {
            write!(f, "  [{}] ", step.index)?;
            match &step.action {
                Some(Action::ToolCall { tool, arguments }) => {
                    write!(f, "call {tool} {}", serde_json::Value::Object(arguments.clone()))?;
                }
                Some(Action::FinalAnswer { .. }) => f.write_str("final answer")?,
                None => f.write_str("planning failed")?,
            }
            if let Some(observation) = &step.observation {
                match observation.error() {
                    Some(error) => write!(f, " -> error: {error}")?,
                    None => f.write_str(" -> ok")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
