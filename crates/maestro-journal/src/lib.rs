//! # maestro-journal
//!
//! Append-only, SHA-256 hash-chained step journal for maestro runs.
//!
//! ## Overview
//!
//! Every step the executor records is wrapped in a `JournalEvent` linked to
//! the previous event of the same run by its hash. When the run terminates
//! the chain is sealed into an `ArchivedRun` together with the outcome.
//! Altering any archived step breaks the chain, which `verify_chain` detects.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maestro_journal::InMemoryJournal;
//!
//! let journal = InMemoryJournal::new();
//! let executor = Executor::new(validator, Arc::new(journal.clone()));
//! let report = executor.run(&agent, task).await;
//!
//! assert!(journal.verify_integrity(&report.run_id));
//! let archived = journal.archive(&report.run_id);
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{ArchivedRun, JournalEvent};
pub use memory::InMemoryJournal;

// ── Tests ─────────────────────────────────────────────────────────────────────
