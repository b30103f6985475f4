//! Journal event and archive types.
//!
//! `JournalEvent` is one link in a run's hash chain: a `Step` plus its
//! position and the hashes that make tampering detectable. `ArchivedRun` is
//! the sealed record kept once a run terminates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maestro_contracts::{
    run::RunOutcome,
    step::Step,
    task::{AgentName, RunId},
};

/// A single entry in the SHA-256 hash chain for one run.
///
/// Changing any field, including those of the embedded `step`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub run_id: RunId,

    /// The step as the executor recorded it.
    pub step: Step,

    /// Hash of the previous event, or `GENESIS_HASH` for the first one.
    pub prev_hash: String,

    /// Hash over (run_id, sequence, prev_hash, canonical JSON of step).
    pub this_hash: String,
}

impl JournalEvent {
    /// The `prev_hash` of the first event in every chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// The sealed journal of a terminated run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedRun {
    pub run_id: RunId,
    pub agent: AgentName,
    pub outcome: RunOutcome,

    /// All events in chain order.
    pub events: Vec<JournalEvent>,

    /// `this_hash` of the last event; empty when the run recorded no steps.
    pub terminal_hash: String,

    pub sealed_at: DateTime<Utc>,
}
