//! Hash-chain primitives.
//!
//! Hash input layout (bytes, in order):
//!   1. run_id as its hyphenated UUID string
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the step (serde_json, compact)

use sha2::{Digest, Sha256};

use maestro_contracts::{
    error::{MaestroError, MaestroResult},
    step::Step,
    task::RunId,
};

use crate::event::JournalEvent;

/// Compute the lowercase hex SHA-256 of one journal event.
///
/// # Errors
///
/// `MaestroError::JournalWriteFailed` if the step cannot be serialized.
pub fn hash_event(run_id: &RunId, sequence: u64, step: &Step, prev_hash: &str) -> MaestroResult<String> {
    let step_json = serde_json::to_vec(step).map_err(|e| MaestroError::JournalWriteFailed {
        reason: format!("step {} is not serializable: {e}", step.index),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(run_id.to_string().as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&step_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Check prev-hash linkage and recompute every hash.
///
/// An empty chain is valid.
pub fn verify_chain(events: &[JournalEvent]) -> bool {
    let mut expected_prev = JournalEvent::GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&event.run_id, event.sequence, &event.step, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
