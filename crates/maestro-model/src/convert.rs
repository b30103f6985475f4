//! Mapping between planning requests and Messages API payloads.
//!
//! History is replayed as a conversation: each tool step becomes an
//! assistant `tool_use` block answered by a user `tool_result` block with the
//! same id. A failed planning step (no action) is replayed as a user note so
//! the model can see what went wrong.

use serde_json::{Map, Value};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    planning::PlanningRequest,
    result::ToolResult,
    step::{Action, Step},
};

use crate::api::{ApiMessage, ApiResponse, ApiTool, ContentBlock, Role};

/// The system prompt for a planning request.
pub fn system_prompt(request: &PlanningRequest) -> String {
    let mut prompt = match &request.instructions {
        Some(instructions) if !instructions.trim().is_empty() => instructions.trim().to_string(),
        _ => format!(
            "You are '{}', an agent that solves tasks step by step using the tools provided.",
            request.agent
        ),
    };

    prompt.push_str(
        "\n\nCall exactly one tool per turn. Tool results are returned to you. \
         When you have the answer, reply with plain text and no tool call; \
         that text is your final answer.",
    );

    if !request.authorized_imports.is_empty() {
        prompt.push_str("\n\nCode you write may only import: ");
        prompt.push_str(&request.authorized_imports.join(", "));
        prompt.push('.');
    }

    prompt
}

/// Advertise every tool with its JSON Schema.
pub fn tools(request: &PlanningRequest) -> Vec<ApiTool> {
    request
        .tools
        .iter()
        .map(|descriptor| ApiTool {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema(),
        })
        .collect()
}

/// The task followed by the replayed history.
pub fn messages(request: &PlanningRequest) -> Vec<ApiMessage> {
    let mut task_text = request.task.instruction.clone();
    if !request.task.context.is_null() {
        task_text.push_str("\n\nContext:\n");
        task_text.push_str(&request.task.context.to_string());
    }

    let mut messages = Vec::new();
    push(&mut messages, Role::User, ContentBlock::Text { text: task_text });

    for step in &request.history {
        replay(&mut messages, step);
    }

    messages
}

fn replay(messages: &mut Vec<ApiMessage>, step: &Step) {
    match &step.action {
        Some(Action::ToolCall { tool, arguments }) => {
            let id = tool_use_id(step.index);
            push(
                messages,
                Role::Assistant,
                ContentBlock::ToolUse {
                    id: id.clone(),
                    name: tool.clone(),
                    input: Value::Object(arguments.clone()),
                },
            );
            let (content, is_error) = match &step.observation {
                Some(observation) => render_observation(observation),
                None => ("no observation recorded".to_string(), true),
            };
            push(
                messages,
                Role::User,
                ContentBlock::ToolResult {
                    tool_use_id: id,
                    content,
                    is_error,
                },
            );
        }
        Some(Action::FinalAnswer { answer }) => {
            push(messages, Role::Assistant, ContentBlock::Text { text: answer.clone() });
        }
        None => {
            let reason = step
                .observation
                .as_ref()
                .and_then(ToolResult::error)
                .unwrap_or("no usable action was produced");
            push(
                messages,
                Role::User,
                ContentBlock::Text {
                    text: format!("Your previous turn failed: {reason}. Try again."),
                },
            );
        }
    }
}

fn render_observation(observation: &ToolResult) -> (String, bool) {
    if let Some(error) = observation.error() {
        return (error.to_string(), true);
    }
    let mut text = match observation.data() {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "ok".to_string(),
    };
    if let Some(count) = observation.affected_count() {
        text.push_str(&format!("\n(affected: {count})"));
    }
    (text, false)
}

/// Append a block, merging into the previous message when the role repeats.
fn push(messages: &mut Vec<ApiMessage>, role: Role, block: ContentBlock) {
    match messages.last_mut() {
        Some(last) if last.role == role => last.content.push(block),
        _ => messages.push(ApiMessage {
            role,
            content: vec![block],
        }),
    }
}

fn tool_use_id(index: u32) -> String {
    format!("toolu_step_{index}")
}

/// Turn a model response into the next action.
///
/// The first `tool_use` block wins; otherwise the text is the final answer.
///
/// # Errors
///
/// `MaestroError::Validation` when the response has neither a usable tool
/// call nor any text.
pub fn parse_action(response: ApiResponse) -> MaestroResult<Action> {
    let mut text = String::new();

    for block in response.content {
        match block {
            ContentBlock::ToolUse { name, input, .. } => {
                let arguments = match input {
                    Value::Object(map) => map,
                    Value::Null => Map::new(),
                    other => {
                        return Err(MaestroError::validation(format!(
                            "tool call '{name}' has non-object input: {other}"
                        )))
                    }
                };
                return Ok(Action::ToolCall { tool: name, arguments });
            }
            ContentBlock::Text { text: chunk } => {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&chunk);
            }
            ContentBlock::ToolResult { .. } => {}
        }
    }

    let answer = text.trim();
    if answer.is_empty() {
        return Err(MaestroError::validation("model returned no usable action"));
    }
    Ok(Action::final_answer(answer))
}
