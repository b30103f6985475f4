//! # maestro-core
//!
//! The step-bounded, tool-calling agent runtime.
//!
//! This crate provides:
//! - The four seam traits (`Tool`, `LanguageModel`, `ArgumentValidator`, `StepJournal`)
//! - `ToolRegistry` and the uniform `invoke` contract
//! - `AgentDescriptor` and the `Executor` that runs the plan → act → observe loop
//! - Delegation to managed agents over message-passing workers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maestro_core::{AgentDescriptor, Executor};
//!
//! let agent = AgentDescriptor::builder("query_analyzer", model)
//!     .tool(sql_tool)?
//!     .step_budget(8)
//!     .build()?;
//! let report = executor.run(&agent, Task::new("How many users signed up in May?")).await;
//! ```

pub mod agent;
pub mod delegation;
pub mod executor;
pub mod invoke;
pub mod registry;
pub mod traits;

pub use agent::{AgentBuilder, AgentDescriptor, RunLimits};
pub use delegation::{spawn_delegate, DelegateHandle, DelegateTool};
pub use executor::Executor;
pub use registry::ToolRegistry;
