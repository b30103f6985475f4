//! # maestro-model
//!
//! `LanguageModel` implementations for the maestro agent loop.
//!
//! - [`AnthropicModel`]: the Anthropic Messages API over `reqwest`, with tool
//!   use, history replay, and backoff retries that honour `retry-after`.
//! - [`ScriptedModel`]: a deterministic replay model for tests and demos.

pub mod anthropic;
pub mod api;
pub mod convert;
pub mod scripted;

pub use anthropic::{AnthropicModel, RetryConfig};
pub use scripted::ScriptedModel;
