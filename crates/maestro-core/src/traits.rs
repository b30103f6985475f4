//! Core trait definitions for the maestro agent loop.
//!
//! These four traits define every seam the executor depends on:
//!
//! - `Tool`              one external capability (database, HTTP API, file)
//! - `LanguageModel`     chooses the next action during Planning
//! - `ArgumentValidator` checks tool arguments before any side effect
//! - `StepJournal`       records every step and seals terminated runs
//!
//! The executor wires them together in loop order. Nothing in this crate
//! knows about a concrete model provider, database, or journal backend.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use maestro_contracts::{
    error::MaestroResult,
    planning::PlanningRequest,
    result::ToolResult,
    run::RunReport,
    step::{Action, Step},
    task::{AgentName, RunId},
    tool::ToolDescriptor,
    validation::ValidationReport,
};

/// Per-invocation context handed to a tool by the executor.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// The run this invocation belongs to.
    pub run_id: RunId,
    /// The agent that proposed the call.
    pub agent: AgentName,
    /// Cancellation for the calling run. Tools that start sub-runs pass a
    /// child of this token along.
    pub cancel: CancellationToken,
}

/// A named, described, schema-validated capability.
///
/// Arguments reaching `execute` have already passed the descriptor check and
/// had defaults applied. Implementations should still deserialize them into a
/// typed record (see [`crate::invoke::parse_arguments`]) and report domain
/// problems as `MaestroError::Validation` before touching anything external.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool's declared interface.
    fn descriptor(&self) -> &ToolDescriptor;

    /// Perform the tool's side effect.
    ///
    /// Return `Ok` with a failed `ToolResult` for expected domain failures,
    /// or `Err` for anything else; the invocation layer turns errors into
    /// failed results so the agent can observe them.
    async fn execute(&self, arguments: Map<String, Value>, ctx: &ToolContext) -> MaestroResult<ToolResult>;

    /// Time limit for one invocation, overriding the agent's default.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// The model boundary: picks the next action given the task and history.
///
/// Retry policy belongs to the implementation. Return
/// `MaestroError::ModelUnavailable` only once retries are exhausted; that
/// error ends the run. Any other error becomes a failed step.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier of the underlying model, for logs.
    fn model_id(&self) -> &str;

    /// Propose the next action.
    async fn plan(&self, request: &PlanningRequest) -> MaestroResult<Action>;
}

/// Checks tool arguments against a tool descriptor.
///
/// Implementations must be pure: no I/O, no calls into the tool.
pub trait ArgumentValidator: Send + Sync {
    /// Return a report with every problem found, or a passing report.
    fn validate(&self, descriptor: &ToolDescriptor, arguments: &Map<String, Value>) -> MaestroResult<ValidationReport>;
}

/// Append-only record of runs.
///
/// Shared by every run an executor drives, so implementations key their
/// state by `RunId`.
pub trait StepJournal: Send + Sync {
    /// Append one step of the given run.
    fn record(&self, run_id: &RunId, agent: &AgentName, step: &Step) -> MaestroResult<()>;

    /// Mark the run as terminated and archive it.
    fn seal(&self, report: &RunReport) -> MaestroResult<()>;
}
