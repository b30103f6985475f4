//! # maestro-verify
//!
//! Argument validation for maestro tool calls.
//!
//! This crate provides [`engine::SchemaValidator`], which implements the
//! [`maestro_core::traits::ArgumentValidator`] trait. Arguments are checked
//! in two phases:
//!
//! 1. **Structural**: JSON Schema validation via the `jsonschema` crate,
//!    against the schema each `ToolDescriptor` renders for itself.
//! 2. **Domain**: per-tool checks registered by the hosting application.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use maestro_verify::engine::SchemaValidator;
//!
//! let mut validator = SchemaValidator::new();
//! validator.register_check("python_file_creator", Box::new(|args| {
//!     let name = args.get("filename").and_then(|v| v.as_str()).unwrap_or("");
//!     name.starts_with('/').then(|| ("filename".into(), "must be relative".into()))
//! }));
//! ```

pub mod engine;

pub use engine::SchemaValidator;
