use std::collections::HashMap;

use log::trace;
use parking_lot::RwLock;
use thiserror::Error;

use crate::data::{RawTransaction, TrackedTx, TxId, TxState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxTrackerError {
    #[error("tx with id {0} already added")]
    DuplicateTx(TxId),
    #[error("tx with id {0} not found")]
    TxNotFound(TxId),
}

/// Thread-safe bookkeeping of transactions currently tracked by the staking
/// workflow, keyed by their content-derived id.
///
/// Entries live for the lifetime of the tracker. State transitions are not
/// validated: [`TxTracker::set_state`] overwrites whatever state an entry
/// currently holds, including `Confirmed` back to `Sent`.
pub struct TxTracker {
    transactions: RwLock<HashMap<TxId, TrackedTx>>,
}

impl TxTracker {
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
        }
    }

    /// Start tracking `tx`. The new entry always starts in [`TxState::Sent`].
    pub fn add(&self, tx: RawTransaction, script: Vec<u8>) -> Result<(), TxTrackerError> {
        let id = tx.id();
        let mut txs = self.transactions.write();
        if txs.contains_key(&id) {
            return Err(TxTrackerError::DuplicateTx(id));
        }
        trace!(target: "tracker", "add({})", id);
        txs.insert(
            id,
            TrackedTx {
                tx,
                script,
                state: TxState::Sent,
            },
        );
        Ok(())
    }

    pub fn set_state(&self, id: &TxId, state: TxState) -> Result<(), TxTrackerError> {
        let mut txs = self.transactions.write();
        let entry = txs
            .get_mut(id)
            .ok_or_else(|| TxTrackerError::TxNotFound(id.clone()))?;
        trace!(target: "tracker", "set_state({}, {:?})", id, state);
        entry.state = state;
        Ok(())
    }

    /// Returns `None` only if `id` is not tracked.
    pub fn get(&self, id: &TxId) -> Option<TrackedTx> {
        self.transactions.read().get(id).cloned()
    }

    /// Stop tracking `id`. No-op if `id` is not tracked.
    pub fn remove(&self, id: &TxId) {
        trace!(target: "tracker", "remove({})", id);
        self.transactions.write().remove(id);
    }

    /// Snapshot of all tracked txs in unspecified order. Not a live view, may
    /// be immediately stale relative to concurrent writers.
    pub fn get_all(&self) -> Vec<TrackedTx> {
        self.transactions.read().values().cloned().collect()
    }
}

impl Default for TxTracker {
    fn default() -> Self {
        Self::new()
    }
}
