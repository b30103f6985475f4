//! Agent-to-agent delegation by message passing.
//!
//! A managed agent runs on its own worker task. Managers never touch the
//! sub-agent directly; they hold a `DelegateHandle` and send it
//! `DelegationRequest`s over an mpsc channel. Each request carries a oneshot
//! sender for the sub-run's `RunReport`.
//!
//! To the manager the whole sub-run is one tool call: `DelegateTool` wraps
//! the handle behind the ordinary `Tool` contract, so a failed sub-run is a
//! failed observation and never a propagated fault.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
    run::{RunOutcome, RunReport},
    task::{AgentName, Task},
    tool::{ParamSpec, ParamType, ToolDescriptor},
};

use crate::{
    agent::AgentDescriptor,
    executor::Executor,
    invoke::parse_arguments,
    traits::{Tool, ToolContext},
};

/// Requests that may wait for a busy worker.
const QUEUE_DEPTH: usize = 16;

/// Extra time the executor grants a delegate call on top of the reply
/// timeout, so the handle's own timeout fires first and cancels the sub-run.
const REPLY_GRACE: Duration = Duration::from_secs(1);

/// One unit of work for a delegate worker.
pub struct DelegationRequest {
    pub task: Task,
    pub cancel: CancellationToken,
    pub reply: oneshot::Sender<RunReport>,
}

/// Caller side of a delegate worker. Cheap to clone.
#[derive(Clone)]
pub struct DelegateHandle {
    name: AgentName,
    description: String,
    timeout: Duration,
    sender: mpsc::Sender<DelegationRequest>,
}

/// Start a worker task that serves sub-runs of `agent`, one at a time.
///
/// Must be called from within a tokio runtime. The worker stops once every
/// handle has been dropped.
pub fn spawn_delegate(executor: Arc<Executor>, agent: Arc<AgentDescriptor>, timeout: Duration) -> DelegateHandle {
    let (sender, mut receiver) = mpsc::channel::<DelegationRequest>(QUEUE_DEPTH);
    let handle = DelegateHandle {
        name: agent.name().clone(),
        description: agent.description().to_string(),
        timeout,
        sender,
    };

    tokio::spawn(async move {
        debug!(agent = %agent.name(), "delegate worker started");
        while let Some(request) = receiver.recv().await {
            let report = executor.run_with_cancel(&agent, request.task, request.cancel).await;
            if request.reply.send(report).is_err() {
                debug!(agent = %agent.name(), "caller stopped waiting for sub-run report");
            }
        }
        debug!(agent = %agent.name(), "delegate worker stopped");
    });

    handle
}

impl DelegateHandle {
    pub fn name(&self) -> &AgentName {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a sub-task and wait for its report.
    ///
    /// On timeout the sub-run is cancelled through `cancel`.
    ///
    /// # Errors
    ///
    /// - `MaestroError::Timeout` if no report arrives in time.
    /// - `MaestroError::Execution` if the worker has stopped.
    pub async fn run(&self, task: Task, cancel: CancellationToken) -> MaestroResult<RunReport> {
        let (reply, receiver) = oneshot::channel();
        let request = DelegationRequest {
            task,
            cancel: cancel.clone(),
            reply,
        };

        let exchange = async {
            self.sender.send(request).await.map_err(|_| self.worker_gone())?;
            receiver.await.map_err(|_| self.worker_gone())
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                warn!(agent = %self.name, seconds = self.timeout.as_secs(), "delegation timed out, sub-run cancelled");
                Err(MaestroError::Timeout {
                    operation: format!("delegation to '{}'", self.name),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }

    /// Wrap the handle as a tool for the managing agent.
    pub fn into_tool(self) -> DelegateTool {
        DelegateTool::new(self)
    }

    fn worker_gone(&self) -> MaestroError {
        MaestroError::execution(format!("delegate worker for '{}' has stopped", self.name))
    }
}

/// The synthetic tool a manager uses to call a managed agent.
pub struct DelegateTool {
    descriptor: ToolDescriptor,
    handle: DelegateHandle,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DelegateArgs {
    task: String,
    #[serde(default)]
    additional_args: Option<Map<String, Value>>,
}

impl DelegateTool {
    pub fn new(handle: DelegateHandle) -> Self {
        let description = if handle.description.is_empty() {
            format!("Delegates a task to the '{}' agent.", handle.name)
        } else {
            handle.description.clone()
        };

        let descriptor = ToolDescriptor::new(handle.name.as_str(), description)
            .param(
                "task",
                ParamSpec::required(ParamType::String, "Long, detailed description of the task for the agent."),
            )
            .param(
                "additional_args",
                ParamSpec::optional(ParamType::Object, "Extra structured context handed to the agent.").nullable(),
            )
            .output(ParamType::Object);

        Self { descriptor, handle }
    }
}

#[async_trait]
impl Tool for DelegateTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, arguments: Map<String, Value>, ctx: &ToolContext) -> MaestroResult<ToolResult> {
        let args: DelegateArgs = parse_arguments(arguments)?;
        if args.task.trim().is_empty() {
            return Err(MaestroError::validation("task must not be empty"));
        }

        let task = Task::new(args.task).with_context(args.additional_args.map_or(Value::Null, Value::Object));

        info!(run_id = %ctx.run_id, manager = %ctx.agent, agent = %self.handle.name, "delegating task");
        let report = self.handle.run(task, ctx.cancel.child_token()).await?;
        let steps = report.steps.len();

        match report.outcome {
            RunOutcome::Done { answer } => Ok(ToolResult::ok(json!({
                "agent": self.handle.name.as_str(),
                "answer": answer,
                "steps": steps,
            }))),
            RunOutcome::Failed { failure } => Ok(ToolResult::failure(format!(
                "agent '{}' failed after {steps} step(s): {failure}",
                self.handle.name
            ))),
        }
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.handle.timeout + REPLY_GRACE)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use tokio_util::sync::CancellationToken;

    use maestro_contracts::{
        error::{MaestroError, MaestroResult},
        planning::PlanningRequest,
        run::{RunFailure, RunReport},
        step::{Action, Step},
        task::{AgentName, RunId, Task},
        tool::ToolDescriptor,
        validation::ValidationReport,
    };

    use crate::{
        agent::{AgentDescriptor, RunLimits},
        executor::Executor,
        traits::{ArgumentValidator, LanguageModel, StepJournal},
    };

    use super::spawn_delegate;

    // ── Mock helpers ─────────────────────────────────────────────────────────

    struct ScriptModel {
        script: Mutex<VecDeque<Action>>,
        fallback: Action,
        delay: Duration,
        tasks: Arc<Mutex<Vec<Task>>>,
    }

    impl ScriptModel {
        fn new(script: Vec<Action>, fallback: Action) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                delay: Duration::ZERO,
                tasks: Arc::new(Mutex::new(vec![])),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptModel {
        fn model_id(&self) -> &str {
            "script"
        }

        async fn plan(&self, request: &PlanningRequest) -> MaestroResult<Action> {
            self.tasks.lock().unwrap().push(request.task.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone()))
        }
    }

    struct PassValidator;

    impl ArgumentValidator for PassValidator {
        fn validate(&self, _d: &ToolDescriptor, _a: &Map<String, Value>) -> MaestroResult<ValidationReport> {
            Ok(ValidationReport::pass())
        }
    }

    #[derive(Default)]
    struct CountingJournal {
        sealed: Arc<Mutex<Vec<RunReport>>>,
    }

    impl StepJournal for CountingJournal {
        fn record(&self, _run_id: &RunId, _agent: &AgentName, _step: &Step) -> MaestroResult<()> {
            Ok(())
        }

        fn seal(&self, report: &RunReport) -> MaestroResult<()> {
            self.sealed.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn executor(journal: Arc<CountingJournal>) -> Arc<Executor> {
        Arc::new(Executor::new(Arc::new(PassValidator), journal))
    }

    fn limits() -> RunLimits {
        RunLimits {
            model_timeout: Duration::from_secs(2),
            tool_timeout: Duration::from_secs(2),
        }
    }

    fn sub_agent(model: ScriptModel, budget: u32) -> Arc<AgentDescriptor> {
        Arc::new(
            AgentDescriptor::builder("query_analyzer", Arc::new(model))
                .description("Analyzes user queries.")
                .step_budget(budget)
                .limits(limits())
                .build()
                .unwrap(),
        )
    }

    fn delegate_call(task: &str) -> Action {
        Action::tool_call("query_analyzer", json!({ "task": task }))
    }

    // ── Test cases ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn successful_sub_run_is_one_manager_step() {
        let journal = Arc::new(CountingJournal::default());
        let executor = executor(journal.clone());

        let sub_model = ScriptModel::new(
            vec![Action::tool_call("missing", json!({})), Action::tool_call("missing", json!({}))],
            Action::final_answer("42 users"),
        );
        let handle = spawn_delegate(executor.clone(), sub_agent(sub_model, 5), Duration::from_secs(5));

        let manager = AgentDescriptor::builder(
            "orchestrator",
            Arc::new(ScriptModel::new(vec![delegate_call("count users")], Action::final_answer("there are 42 users"))),
        )
        .limits(limits())
        .manage(handle)
        .unwrap()
        .build()
        .unwrap();

        let report = executor.run(&manager, Task::new("how many users?")).await;

        assert_eq!(report.answer(), Some("there are 42 users"));
        assert_eq!(report.steps.len(), 2);
        let data = report.steps[0].observation.as_ref().unwrap().data().unwrap();
        assert_eq!(data["agent"], "query_analyzer");
        assert_eq!(data["answer"], "42 users");
        assert_eq!(data["steps"], 3);

        // Both the sub-run and the manager run are sealed.
        assert_eq!(journal.sealed.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_sub_agent_is_a_single_failed_observation() {
        let executor = executor(Arc::new(CountingJournal::default()));
        let sub_model = ScriptModel::new(vec![], Action::tool_call("nothing_here", json!({})));
        let handle = spawn_delegate(executor.clone(), sub_agent(sub_model, 2), Duration::from_secs(5));

        let manager = AgentDescriptor::builder(
            "orchestrator",
            Arc::new(ScriptModel::new(vec![delegate_call("do it")], Action::final_answer("reported failure"))),
        )
        .limits(limits())
        .manage(handle)
        .unwrap()
        .build()
        .unwrap();

        let report = executor.run(&manager, Task::new("t")).await;

        assert!(report.is_done());
        assert_eq!(report.steps.len(), 2);
        let error = report.steps[0].observation.as_ref().unwrap().error().unwrap();
        assert!(error.contains("query_analyzer"), "got: {error}");
        assert!(error.contains("2 step(s)"), "got: {error}");
        assert!(error.contains("step budget of 2"), "got: {error}");
    }

    #[tokio::test]
    async fn additional_args_reach_the_sub_agent_as_context() {
        let executor = executor(Arc::new(CountingJournal::default()));
        let sub_model = ScriptModel::new(vec![], Action::final_answer("ok"));
        let seen = sub_model.tasks.clone();
        let handle = spawn_delegate(executor.clone(), sub_agent(sub_model, 3), Duration::from_secs(5));

        let report = handle
            .run(Task::new("query").with_context(json!({ "table": "users" })), CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_done());
        assert_eq!(seen.lock().unwrap()[0].context["table"], "users");
        assert_eq!(handle.name().as_str(), "query_analyzer");
    }

    #[tokio::test]
    async fn slow_sub_agent_times_out_and_is_cancelled() {
        let journal = Arc::new(CountingJournal::default());
        let executor = executor(journal.clone());
        let mut sub_model = ScriptModel::new(vec![], Action::tool_call("missing", json!({})));
        sub_model.delay = Duration::from_millis(100);
        let handle = spawn_delegate(executor.clone(), sub_agent(sub_model, 50), Duration::from_millis(250));

        let cancel = CancellationToken::new();
        let result = handle.run(Task::new("spin"), cancel.clone()).await;

        match result {
            Err(MaestroError::Timeout { operation, .. }) => assert!(operation.contains("query_analyzer")),
            other => panic!("expected Timeout, got {:?}", other.map(|r| r.outcome)),
        }
        assert!(cancel.is_cancelled());

        // The worker observes the cancellation at its next boundary and seals the sub-run.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let sealed = journal.sealed.lock().unwrap();
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].failure(), Some(&RunFailure::Cancelled));
    }

    #[tokio::test]
    async fn managed_agent_name_clash_is_duplicate() {
        let executor = executor(Arc::new(CountingJournal::default()));
        let first = spawn_delegate(
            executor.clone(),
            sub_agent(ScriptModel::new(vec![], Action::final_answer("a")), 1),
            Duration::from_secs(1),
        );
        let second = first.clone();

        let result = AgentDescriptor::builder("orchestrator", Arc::new(ScriptModel::new(vec![], Action::final_answer("x"))))
            .manage(first)
            .unwrap()
            .manage(second);

        assert!(matches!(result, Err(MaestroError::DuplicateName { .. })));
    }

    #[tokio::test]
    async fn delegate_descriptor_declares_task_and_additional_args() {
        let executor = executor(Arc::new(CountingJournal::default()));
        let handle = spawn_delegate(
            executor,
            sub_agent(ScriptModel::new(vec![], Action::final_answer("a")), 1),
            Duration::from_secs(1),
        );
        let tool = handle.into_tool();
        let descriptor = crate::traits::Tool::descriptor(&tool);

        assert_eq!(descriptor.name, "query_analyzer");
        assert_eq!(descriptor.description, "Analyzes user queries.");
        assert!(descriptor.inputs["task"].required);
        assert!(!descriptor.inputs["additional_args"].required);
        assert!(descriptor.check().is_ok());
    }
}
