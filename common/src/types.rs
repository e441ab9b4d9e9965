//! Core types shared across Obelisk modules.

use crate::{ChainNumber, TxPowHash};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};

/// An externally-validated candidate proof-of-work block.
///
/// Proof-of-work, signature and transaction checks all happen upstream;
/// by the time one of these reaches the chain tree it is structurally
/// sound and travels with a precomputed validity verdict.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PowBlock {
    /// Content hash - the block's identity
    pub hash: TxPowHash,

    /// Hash of the parent block
    pub parent: TxPowHash,

    /// Block height; integral
    pub number: ChainNumber,

    /// Timestamp in milliseconds
    pub timestamp: ChainNumber,

    /// Difficulty exponent; the block's work contribution is 2^difficulty
    pub difficulty: u32,
}

/// Opaque handle into the external commitment (MMR) subsystem.
///
/// The chain tree only ever records the child-to-parent link between
/// consecutive snapshots; the snapshots themselves are owned by the
/// commitment subsystem, so the back-link is weak.
#[derive(Debug, Default)]
pub struct MmrAnchor {
    parent: Mutex<Weak<MmrAnchor>>,
}

/// Shared, non-owning reference to a commitment snapshot.
pub type CommitmentHandle = Arc<MmrAnchor>;

impl MmrAnchor {
    pub fn new() -> CommitmentHandle {
        Arc::new(Self::default())
    }

    /// Record `parent` as this snapshot's predecessor.
    pub fn link_parent(&self, parent: &CommitmentHandle) {
        *self.parent.lock().unwrap() = Arc::downgrade(parent);
    }

    /// The linked predecessor, if still alive.
    pub fn parent(&self) -> Option<CommitmentHandle> {
        self.parent.lock().unwrap().upgrade()
    }
}
