//! Tool descriptor types.
//!
//! A `ToolDescriptor` is the declared interface of one tool: its name, what it
//! does, and every parameter it accepts. The descriptor doubles as the JSON
//! Schema advertised to the model and as the contract the argument validator
//! enforces before the tool runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{MaestroError, MaestroResult};

/// The value type of a tool parameter or a tool's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    /// Any JSON value.
    Any,
}

impl ParamType {
    /// Return true if `value` is an instance of this type (`null` never is).
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
            ParamType::Any => !value.is_null(),
        }
    }

    /// The JSON Schema `type` keyword, or `None` for `Any`.
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            ParamType::String => Some("string"),
            ParamType::Integer => Some("integer"),
            ParamType::Number => Some("number"),
            ParamType::Boolean => Some("boolean"),
            ParamType::Object => Some("object"),
            ParamType::Array => Some("array"),
            ParamType::Any => None,
        }
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    /// Whether the caller must supply the parameter.
    #[serde(default)]
    pub required: bool,
    /// Whether an explicit `null` is accepted.
    #[serde(default)]
    pub nullable: bool,
    /// Value filled in when the parameter is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A parameter the caller must always supply.
    pub fn required(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            param_type,
            description: description.into(),
            required: true,
            nullable: false,
            default: None,
        }
    }

    /// A parameter the caller may omit.
    pub fn optional(param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(param_type, description)
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        match (self.param_type.json_type(), self.nullable) {
            (Some(t), true) => {
                schema.insert("type".into(), json!([t, "null"]));
            }
            (Some(t), false) => {
                schema.insert("type".into(), json!(t));
            }
            (None, true) => {}
            (None, false) => {
                schema.insert("not".into(), json!({ "type": "null" }));
            }
        }
        schema.insert("description".into(), json!(self.description));
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        Value::Object(schema)
    }
}

/// The declared interface of one tool.
///
/// Invariant (checked by [`ToolDescriptor::check`] at registration): the name
/// is non-empty and model-safe, and every parameter the tool accepts is listed
/// in `inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique within a registry.
    pub name: String,
    pub description: String,
    /// Every accepted parameter, keyed by name.
    pub inputs: BTreeMap<String, ParamSpec>,
    pub output_type: ParamType,
}

impl ToolDescriptor {
    /// Start a descriptor with no parameters and an `Any` output.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs: BTreeMap::new(),
            output_type: ParamType::Any,
        }
    }

    /// Declare a parameter.
    pub fn param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    /// Declare the output type tag.
    pub fn output(mut self, output_type: ParamType) -> Self {
        self.output_type = output_type;
        self
    }

    /// Render the inputs as a JSON Schema object.
    ///
    /// Unknown parameters are rejected (`additionalProperties: false`).
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .inputs
            .iter()
            .map(|(name, spec)| (name.clone(), spec.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .inputs
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Fill in declared defaults for parameters the caller omitted.
    pub fn apply_defaults(&self, arguments: &mut Map<String, Value>) {
        for (name, spec) in &self.inputs {
            if let Some(default) = &spec.default {
                arguments.entry(name.clone()).or_insert_with(|| default.clone());
            }
        }
    }

    /// Check the descriptor itself for consistency.
    ///
    /// # Errors
    ///
    /// `MaestroError::Validation` when the name is empty or contains
    /// characters outside `[A-Za-z0-9_-]`, a required parameter declares a
    /// default, or a default does not match its parameter type.
    pub fn check(&self) -> MaestroResult<()> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(MaestroError::validation(format!(
                "tool name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }

        for (param, spec) in &self.inputs {
            let Some(default) = &spec.default else {
                continue;
            };
            if spec.required {
                return Err(MaestroError::validation(format!(
                    "tool '{}': required parameter '{}' cannot declare a default",
                    self.name, param
                )));
            }
            let fits = spec.param_type.accepts(default) || (spec.nullable && default.is_null());
            if !fits {
                return Err(MaestroError::validation(format!(
                    "tool '{}': default for parameter '{}' is not of type {:?}",
                    self.name, param, spec.param_type
                )));
            }
        }

        Ok(())
    }
}
