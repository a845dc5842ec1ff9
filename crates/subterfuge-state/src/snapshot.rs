//! State snapshots with BLAKE3 content hashing.
//!
//! A [`StateSnapshot`] is a serializable copy of a [`GameState`] plus the
//! BLAKE3 hex digest of its canonical JSON encoding. Two states hash equal if
//! and only if every entity, component, roster, pool, and the current tick
//! are identical, which is what replay determinism checks compare.

use serde::{Deserialize, Serialize};

use crate::state::GameState;
use crate::StateError;

/// A serializable copy of the game state with its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// The captured state.
    pub state: GameState,
    /// BLAKE3 hex digest (64 lowercase hex chars) of `state`.
    pub hash: String,
}

/// Compute the BLAKE3 hex digest of the canonical JSON encoding of `state`.
fn compute_hash(state: &GameState) -> String {
    // Every map in GameState is a BTreeMap, so the encoding is canonical.
    let json_bytes =
        serde_json::to_vec(state).expect("GameState should always be JSON-serializable");
    blake3::hash(&json_bytes).to_hex().to_string()
}

impl GameState {
    /// BLAKE3 hex digest of the full state.
    pub fn state_hash(&self) -> String {
        compute_hash(self)
    }

    /// Capture a snapshot of the state.
    pub fn capture_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            state: self.clone(),
            hash: compute_hash(self),
        }
    }
}

impl StateSnapshot {
    /// Recompute the hash and compare it with the recorded one.
    ///
    /// # Errors
    ///
    /// [`StateError::SnapshotHashMismatch`] if the snapshot was corrupted or
    /// tampered with after capture.
    pub fn verify(&self) -> Result<(), StateError> {
        let recomputed = compute_hash(&self.state);
        if recomputed != self.hash {
            return Err(StateError::SnapshotHashMismatch {
                recorded: self.hash.clone(),
                recomputed,
            });
        }
        Ok(())
    }

    /// Verify the snapshot and hand back the state.
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify).
    pub fn into_state(self) -> Result<GameState, StateError> {
        self.verify()?;
        Ok(self.state)
    }
}
