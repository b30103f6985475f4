//! # maestro-contracts
//!
//! Shared types, result contracts, and errors for the maestro agent runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, invariant-preserving constructors, and
//! the error taxonomy.

pub mod error;
pub mod planning;
pub mod result;
pub mod run;
pub mod step;
pub mod task;
pub mod tool;
pub mod validation;
