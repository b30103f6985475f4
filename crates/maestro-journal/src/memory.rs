//! In-memory implementation of `StepJournal`.
//!
//! `InMemoryJournal` keeps one hash chain per open run and moves it into an
//! archive when the run is sealed. State lives behind `Arc<Mutex<_>>`, so a
//! clone of the journal observes the same runs as the executor writing to it.
//!
//! Sealed runs stay in memory until they are taken with `take_archive`. A
//! journal built with `with_retention(n)` keeps at most `n` sealed runs and
//! drops the oldest first; a run dropped that way can no longer be read or
//! verified.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    run::RunReport,
    step::Step,
    task::{AgentName, RunId},
};
use maestro_core::traits::StepJournal;

use crate::{
    chain::{hash_event, verify_chain},
    event::{ArchivedRun, JournalEvent},
};

// ── Internal mutable state ────────────────────────────────────────────────────

/// The chain of a run that has not been sealed yet.
pub(crate) struct OpenChain {
    pub(crate) agent: AgentName,
    pub(crate) events: Vec<JournalEvent>,
    pub(crate) last_hash: String,
}

impl OpenChain {
    fn new(agent: AgentName) -> Self {
        Self {
            agent,
            events: Vec::new(),
            last_hash: JournalEvent::GENESIS_HASH.to_string(),
        }
    }
}

#[derive(Default)]
pub(crate) struct JournalState {
    pub(crate) open: HashMap<RunId, OpenChain>,
    pub(crate) archived: HashMap<RunId, ArchivedRun>,
    /// Archived run ids, oldest seal first.
    pub(crate) sealed_order: VecDeque<RunId>,
}

// ── Public journal ────────────────────────────────────────────────────────────

/// An in-memory, append-only journal backed by per-run SHA-256 hash chains.
#[derive(Clone, Default)]
pub struct InMemoryJournal {
    pub(crate) state: Arc<Mutex<JournalState>>,
    retention: Option<usize>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_archived` sealed runs.
    pub fn with_retention(max_archived: usize) -> Self {
        Self {
            retention: Some(max_archived),
            ..Self::default()
        }
    }

    /// Remove a sealed run from the journal and hand it to the caller.
    ///
    /// # Errors
    ///
    /// `MaestroError::JournalWriteFailed` if the state lock is poisoned.
    pub fn take_archive(&self, run_id: &RunId) -> MaestroResult<Option<ArchivedRun>> {
        let mut state = self.write()?;
        let taken = state.archived.remove(run_id);
        if taken.is_some() {
            state.sealed_order.retain(|id| id != run_id);
        }
        Ok(taken)
    }

    /// The sealed record of a terminated run.
    pub fn archive(&self, run_id: &RunId) -> Option<ArchivedRun> {
        self.read().archived.get(run_id).cloned()
    }

    /// Every event recorded for a run so far, sealed or not.
    pub fn events(&self, run_id: &RunId) -> Vec<JournalEvent> {
        let state = self.read();
        if let Some(archived) = state.archived.get(run_id) {
            return archived.events.clone();
        }
        state
            .open
            .get(run_id)
            .map(|chain| chain.events.clone())
            .unwrap_or_default()
    }

    /// Ids of every sealed run.
    pub fn archived_runs(&self) -> Vec<RunId> {
        self.read().archived.keys().copied().collect()
    }

    /// Check that a run's chain has not been altered.
    ///
    /// Unknown runs verify as an empty chain.
    pub fn verify_integrity(&self, run_id: &RunId) -> bool {
        verify_chain(&self.events(run_id))
    }

    /// Lock for inspection. A poisoned lock still holds consistent data:
    /// every mutation completes before the guard is released.
    fn read(&self) -> MutexGuard<'_, JournalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> MaestroResult<MutexGuard<'_, JournalState>> {
        self.state.lock().map_err(|e| MaestroError::JournalWriteFailed {
            reason: format!("journal state lock poisoned: {e}"),
        })
    }
}

// ── StepJournal impl ──────────────────────────────────────────────────────────

impl StepJournal for InMemoryJournal {
    /// Append one step to the run's chain, opening the chain on first use.
    fn record(&self, run_id: &RunId, agent: &AgentName, step: &Step) -> MaestroResult<()> {
        let mut state = self.write()?;

        if state.archived.contains_key(run_id) {
            return Err(MaestroError::JournalWriteFailed {
                reason: format!("run {run_id} is already sealed"),
            });
        }

        let chain = state
            .open
            .entry(*run_id)
            .or_insert_with(|| OpenChain::new(agent.clone()));

        let sequence = chain.events.len() as u64;
        let prev_hash = chain.last_hash.clone();
        let this_hash = hash_event(run_id, sequence, step, &prev_hash)?;

        chain.events.push(JournalEvent {
            sequence,
            run_id: *run_id,
            step: step.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        chain.last_hash = this_hash;

        debug!(run_id = %run_id, sequence, "journal event appended");
        Ok(())
    }

    /// Close the run's chain and archive it with the run's outcome.
    fn seal(&self, report: &RunReport) -> MaestroResult<()> {
        let mut state = self.write()?;

        if state.archived.contains_key(&report.run_id) {
            return Err(MaestroError::JournalWriteFailed {
                reason: format!("run {} is already sealed", report.run_id),
            });
        }

        let chain = state
            .open
            .remove(&report.run_id)
            .unwrap_or_else(|| OpenChain::new(report.agent.clone()));
        let terminal_hash = chain.events.last().map(|e| e.this_hash.clone()).unwrap_or_default();

        info!(
            run_id = %report.run_id,
            agent = %chain.agent,
            event_count = chain.events.len(),
            terminal_hash = %terminal_hash,
            "run journal sealed"
        );

        state.archived.insert(
            report.run_id,
            ArchivedRun {
                run_id: report.run_id,
                agent: chain.agent,
                outcome: report.outcome.clone(),
                events: chain.events,
                terminal_hash,
                sealed_at: Utc::now(),
            },
        );
        state.sealed_order.push_back(report.run_id);

        if let Some(limit) = self.retention {
            while state.sealed_order.len() > limit {
                let Some(oldest) = state.sealed_order.pop_front() else {
                    break;
                };
                state.archived.remove(&oldest);
                debug!(run_id = %oldest, limit, "archived run evicted");
            }
        }

        Ok(())
    }
}
