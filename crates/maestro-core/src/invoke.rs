//! The uniform tool invocation contract.
//!
//! `invoke` is the only path from the executor into a tool:
//!
//!   validate arguments → apply defaults → execute → wrap errors
//!
//! Validation failures are reported before the tool can perform any side
//! effect. Whatever happens, the caller gets a `ToolResult`, never an error.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    result::ToolResult,
};

use crate::traits::{ArgumentValidator, Tool, ToolContext};

/// Validate and execute one tool call.
pub async fn invoke(
    tool: &dyn Tool,
    validator: &dyn ArgumentValidator,
    mut arguments: Map<String, Value>,
    ctx: &ToolContext,
) -> ToolResult {
    let descriptor = tool.descriptor();

    match validator.validate(descriptor, &arguments) {
        Ok(report) if report.passed => {}
        Ok(report) => {
            let err = MaestroError::validation(format!("tool '{}': {}", descriptor.name, report.summary()));
            warn!(run_id = %ctx.run_id, tool = %descriptor.name, error = %err, "arguments rejected");
            return ToolResult::failure(err.to_string());
        }
        Err(err) => {
            warn!(run_id = %ctx.run_id, tool = %descriptor.name, error = %err, "argument validator failed");
            return ToolResult::failure(err.to_string());
        }
    }

    descriptor.apply_defaults(&mut arguments);

    debug!(run_id = %ctx.run_id, tool = %descriptor.name, "executing tool");
    match tool.execute(arguments, ctx).await {
        Ok(result) => result,
        Err(err) => {
            warn!(run_id = %ctx.run_id, tool = %descriptor.name, error = %err, "tool execution failed");
            ToolResult::failure(err.to_string())
        }
    }
}

/// Deserialize validated arguments into a tool's typed argument record.
///
/// # Errors
///
/// `MaestroError::Validation` if the arguments do not fit `T`.
pub fn parse_arguments<T: DeserializeOwned>(arguments: Map<String, Value>) -> MaestroResult<T> {
    serde_json::from_value(Value::Object(arguments)).map_err(|e| MaestroError::validation(e.to_string()))
}
