//! Schema-based argument validator for maestro tool calls.
//!
//! `SchemaValidator` implements the `ArgumentValidator` trait from
//! `maestro-core`. Validation runs in two phases:
//!
//! 1. **Structural**: the arguments are checked against the JSON Schema
//!    rendered from the tool's descriptor (`ToolDescriptor::input_schema`),
//!    which catches missing required parameters, wrong types, and unknown
//!    parameters.
//! 2. **Domain**: checks registered for the tool's name run over the same
//!    arguments (e.g. "the SQL statement must not be blank").
//!
//! All failures are collected before returning so the model sees the full
//! set in one observation.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use maestro_contracts::{
    error::MaestroResult,
    tool::ToolDescriptor,
    validation::{ValidationFailure, ValidationReport},
};
use maestro_core::traits::ArgumentValidator;

/// A caller-supplied argument check.
///
/// Returns `Some((parameter, message))` when the arguments are unacceptable.
pub type DomainCheckFn = Box<dyn Fn(&Map<String, Value>) -> Option<(String, String)> + Send + Sync>;

/// The maestro argument validator.
pub struct SchemaValidator {
    /// Domain checks keyed by tool name.
    checks: HashMap<String, Vec<DomainCheckFn>>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self {
            checks: HashMap::new(),
        }
    }

    /// Register a domain check for the tool called `tool`.
    ///
    /// Several checks may be registered per tool; all of them run.
    pub fn register_check(&mut self, tool: impl Into<String>, check: DomainCheckFn) {
        self.checks.entry(tool.into()).or_default().push(check);
    }

    /// Map a JSON pointer like `/query` to the parameter it names.
    fn parameter_of(pointer: &str) -> String {
        pointer
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("$")
            .to_string()
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentValidator for SchemaValidator {
    fn validate(&self, descriptor: &ToolDescriptor, arguments: &Map<String, Value>) -> MaestroResult<ValidationReport> {
        let mut failures: Vec<ValidationFailure> = Vec::new();
        let instance = Value::Object(arguments.clone());

        // ── Phase 1: structural ──────────────────────────────────────────────
        let schema = descriptor.input_schema();
        match jsonschema::validator_for(&schema) {
            Ok(validator) => {
                for error in validator.iter_errors(&instance) {
                    let parameter = Self::parameter_of(&error.instance_path.to_string());
                    let message = error.to_string();
                    warn!(tool = %descriptor.name, %parameter, %message, "argument schema violation");
                    failures.push(ValidationFailure { parameter, message });
                }
            }
            Err(e) => {
                let message = format!("tool declares an invalid input schema: {e}");
                warn!(tool = %descriptor.name, %message, "schema compilation failure");
                failures.push(ValidationFailure {
                    parameter: "$".to_string(),
                    message,
                });
            }
        }

        // ── Phase 2: domain checks ───────────────────────────────────────────
        if let Some(checks) = self.checks.get(&descriptor.name) {
            for check in checks {
                if let Some((parameter, message)) = check(arguments) {
                    warn!(tool = %descriptor.name, %parameter, %message, "domain check failed");
                    failures.push(ValidationFailure { parameter, message });
                }
            }
        }

        debug!(
            tool = %descriptor.name,
            passed = failures.is_empty(),
            failure_count = failures.len(),
            "argument validation complete"
        );

        Ok(ValidationReport::from_failures(failures))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
