//! Demo scenarios.
//!
//! Each scenario wires real maestro components (schema validator, journal,
//! executor, tools) to scripted models and the fictional data in
//! `mock_data`, then prints what happened step by step.

pub mod budget_exhaustion;
pub mod code_agent;
pub mod delegation;
pub mod document_query;
pub mod team;

use std::sync::Arc;

use maestro_contracts::run::RunReport;
use maestro_core::Executor;
use maestro_journal::InMemoryJournal;
use maestro_verify::SchemaValidator;

/// An executor over a fresh journal, plus a handle to inspect that journal.
pub(crate) fn executor() -> (Arc<Executor>, InMemoryJournal) {
    let journal = InMemoryJournal::new();
    let executor = Executor::new(Arc::new(SchemaValidator::new()), Arc::new(journal.clone()));
    (Arc::new(executor), journal)
}

/// Print a run report indented under the scenario heading.
pub(crate) fn print_report(report: &RunReport) {
    for line in report.to_string().lines() {
        println!("  {line}");
    }
    println!();
}

/// Print the journal's view of a run: chain length and integrity.
pub(crate) fn print_journal(journal: &InMemoryJournal, report: &RunReport) {
    let events = journal.events(&report.run_id).len();
    let sealed = journal.archive(&report.run_id).is_some();
    println!(
        "  Journal chain integrity: {} ({} event(s), {})",
        if journal.verify_integrity(&report.run_id) { "VERIFIED" } else { "FAILED" },
        events,
        if sealed { "sealed" } else { "open" }
    );
    println!();
}
