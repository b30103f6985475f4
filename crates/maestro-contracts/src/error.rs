//! Runtime error types for the maestro agent runtime.
//!
//! All fallible operations return `MaestroResult<T>`. The agent loop decides
//! per variant whether an error becomes a failed step observation (the agent
//! gets to see it and recover) or ends the run.

use thiserror::Error;

/// The unified error type for the maestro runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaestroError {
    /// Tool arguments were missing, unknown, or malformed.
    ///
    /// Always raised before the tool performs any side effect.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// The capability behind a tool failed (network, query, I/O).
    #[error("execution error: {reason}")]
    Execution { reason: String },

    /// The model proposed a tool that is not in the agent's registry.
    #[error("unknown tool: '{name}'")]
    UnknownTool { name: String },

    /// A tool with this name is already registered.
    #[error("duplicate tool name: '{name}'")]
    DuplicateName { name: String },

    /// The run took `budget` steps without producing a final answer.
    #[error("step budget of {budget} exhausted without a final answer")]
    StepBudgetExceeded { budget: u32 },

    /// The planning call failed after the model integration's own retries.
    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// A model or tool call did not complete within its time limit.
    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// The run was cancelled by its caller.
    #[error("run cancelled")]
    Cancelled,

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The step journal could not persist a record.
    #[error("journal write failed: {reason}")]
    JournalWriteFailed { reason: String },
}

impl MaestroError {
    /// Shorthand for a `Validation` error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation { reason: reason.into() }
    }

    /// Shorthand for an `Execution` error.
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution { reason: reason.into() }
    }

    /// Shorthand for a `Config` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config { reason: reason.into() }
    }
}

/// Convenience alias used throughout the maestro crates.
pub type MaestroResult<T> = Result<T, MaestroError>;
