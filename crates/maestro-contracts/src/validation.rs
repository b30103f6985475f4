//! Argument validation report types.
//!
//! Before any tool runs, its arguments are checked against the tool's
//! descriptor. Only a passing `ValidationReport` lets the invocation proceed.

use serde::{Deserialize, Serialize};

/// The result of checking one set of arguments against a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True only if no failures were found.
    pub passed: bool,
    /// Every problem found, not just the first. Empty on pass.
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failures: Vec::new(),
        }
    }

    /// Build a report from collected failures; passes when there are none.
    pub fn from_failures(failures: Vec<ValidationFailure>) -> Self {
        Self {
            passed: failures.is_empty(),
            failures,
        }
    }

    /// All failures joined into one line, e.g. for a ToolResult error.
    pub fn summary(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("[{}] {}", f.parameter, f.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A single problem within a `ValidationReport`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// The offending parameter, or `"$"` for the argument object itself.
    pub parameter: String,
    pub message: String,
}
