//! The structured result every tool invocation produces.
//!
//! Fields are private: the only ways to build a `ToolResult` are the
//! constructors below and deserialization, both of which uphold the
//! success/error invariant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one tool invocation (or one delegated sub-run).
///
/// Invariant: `success == false` implies `data` is absent and `error` is a
/// non-empty message; `success == true` implies `error` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawToolResult")]
pub struct ToolResult {
    success: bool,
    data: Option<Value>,
    error: Option<String>,
    affected_count: Option<u64>,
}

impl ToolResult {
    /// A successful result carrying `data` (`null` is stored as absent).
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: (!data.is_null()).then_some(data),
            error: None,
            affected_count: None,
        }
    }

    /// A successful result carrying `data` and a row/document count.
    pub fn ok_with_count(data: Value, affected_count: u64) -> Self {
        Self {
            affected_count: Some(affected_count),
            ..Self::ok(data)
        }
    }

    /// A successful mutation that returns only how many items it touched.
    pub fn affected(affected_count: u64) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            affected_count: Some(affected_count),
        }
    }

    /// A failed result. An empty message is replaced so `error` is never blank.
    pub fn failure(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "tool failed without an error message".to_string();
        }
        Self {
            success: false,
            data: None,
            error: Some(error),
            affected_count: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn affected_count(&self) -> Option<u64> {
        self.affected_count
    }

    /// Consume the result, returning its data if any.
    pub fn into_data(self) -> Option<Value> {
        self.data
    }
}

/// Unchecked wire shape, converted into `ToolResult` only if it is consistent.
#[derive(Deserialize)]
struct RawToolResult {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, alias = "affected_rows")]
    affected_count: Option<u64>,
}

impl TryFrom<RawToolResult> for ToolResult {
    type Error = String;

    fn try_from(raw: RawToolResult) -> Result<Self, Self::Error> {
        if raw.success {
            if raw.error.is_some() {
                return Err("successful tool result must not carry an error".to_string());
            }
        } else {
            if raw.data.as_ref().is_some_and(|d| !d.is_null()) {
                return Err("failed tool result must not carry data".to_string());
            }
            if raw.error.as_deref().map_or(true, |e| e.trim().is_empty()) {
                return Err("failed tool result must carry an error message".to_string());
            }
        }

        Ok(Self {
            success: raw.success,
            data: raw.data.filter(|d| !d.is_null()),
            error: raw.error,
            affected_count: raw.affected_count,
        })
    }
}
