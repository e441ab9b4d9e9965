//! Node representation within the block tree.

use num_bigint::BigInt;
use num_traits::One;
use obelisk_common::{CommitmentHandle, PowBlock, TxPowHash};

/// Validity state of a tree node.
///
/// `Pending` nodes stay linked into the tree so their descendants can
/// attach, but they contribute no weight until the upstream pipeline
/// vouches for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Linked but not yet vouched for by validation
    Pending,
    /// Fully validated; participates in weight propagation
    Valid,
}

/// One candidate block's position in the chain, addressed by its hash
/// in the tree's arena. Node identity is byte equality of that hash.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// The candidate block payload
    pub block: PowBlock,

    /// Validity state
    pub state: NodeState,

    /// Parent hash; `None` only for the root
    pub parent: Option<TxPowHash>,

    /// Child hashes, kept in insertion order - the order doubles as the
    /// chain-selection tie-break
    pub children: Vec<TxPowHash>,

    /// This node's own weight plus the weight of every valid descendant
    pub total_weight: BigInt,

    /// Snapshot of the external commitment structure, when supplied
    pub commitment: Option<CommitmentHandle>,

    /// Set once the node lies at or beyond the pruning cascade horizon
    pub is_cascade: bool,
}

impl TreeNode {
    /// Create an unlinked node; the tree fills in the links when the
    /// node is attached.
    pub fn new(block: PowBlock, state: NodeState) -> Self {
        let total_weight = BigInt::one() << block.difficulty;
        Self {
            block,
            state,
            parent: None,
            children: Vec::new(),
            total_weight,
            commitment: None,
            is_cascade: false,
        }
    }

    /// Same, carrying a commitment snapshot handle.
    pub fn with_commitment(
        block: PowBlock,
        state: NodeState,
        commitment: CommitmentHandle,
    ) -> Self {
        let mut node = Self::new(block, state);
        node.commitment = Some(commitment);
        node
    }

    pub fn hash(&self) -> TxPowHash {
        self.block.hash
    }

    /// The node's own work contribution: 2^difficulty.
    pub fn weight(&self) -> BigInt {
        BigInt::one() << self.block.difficulty
    }

    /// Reset the cumulative weight to the node's own contribution.
    pub fn reset_weight(&mut self) {
        self.total_weight = self.weight();
    }

    /// Accumulate a descendant's weight during the upward cascade pass.
    pub fn add_to_total_weight(&mut self, delta: &BigInt) {
        self.total_weight += delta;
    }
}
