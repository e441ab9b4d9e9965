//! Block tree for tracking candidate proof-of-work blocks.
//!
//! Every known candidate is held as a node in a parent/child tree; the
//! canonical chain is the GHOST-style heaviest branch, selected by
//! cumulative subtree weight rather than raw length. A cascade pointer
//! marks the horizon beyond which history is final: nothing may attach
//! at or below it, and pruning (performed elsewhere) discards it.
//!
//! The tree holds no locks. Exactly one logical actor may mutate it -
//! the owning module's single message loop - and read-only queries must
//! never run concurrently with a mutation.

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::Zero;
use obelisk_common::{ChainNumber, TxPowHash};
use tracing::{debug, warn};

use crate::tree_error::ChainTreeError;
use crate::tree_node::{NodeState, TreeNode};

/// The top-level structure owning every tracked candidate block.
///
/// Nodes live in a hash-keyed arena; parent/child relations are stored
/// as hashes, giving O(1) navigation both ways without ownership
/// cycles. Only the span between the cascade horizon and the frontier
/// is ever held, so every operation is bounded by the active working
/// set, not full chain history.
pub struct BlockTree {
    /// All nodes keyed by block hash.
    nodes: HashMap<TxPowHash, TreeNode>,
    /// The oldest retained node; no parent.
    root: Option<TxPowHash>,
    /// Head of the current canonical (heaviest) branch.
    tip: Option<TxPowHash>,
    /// Ancestor of tip beyond which history may be pruned; candidates
    /// at or below its height are permanently rejected.
    cascade: Option<TxPowHash>,
    /// Stricter horizon slightly ahead of the cascade node, beyond
    /// which parents are allowed to be pre-cascade.
    last: Option<TxPowHash>,
}

impl BlockTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            root: None,
            tip: None,
            cascade: None,
            last: None,
        }
    }

    /// Install the first node; root, tip and cascade all start there.
    pub fn set_root(&mut self, mut node: TreeNode) {
        let hash = node.hash();
        node.parent = None;
        self.nodes.insert(hash, node);
        self.root = Some(hash);
        self.tip = Some(hash);
        self.cascade = Some(hash);
    }

    /// Returns the root node, if the tree is non-empty.
    pub fn chain_root(&self) -> Option<&TreeNode> {
        self.root.and_then(|h| self.nodes.get(&h))
    }

    /// Returns the tip of the canonical branch.
    pub fn chain_tip(&self) -> Option<&TreeNode> {
        self.tip.and_then(|h| self.nodes.get(&h))
    }

    /// Returns the cascade-horizon node.
    pub fn cascade_node(&self) -> Option<&TreeNode> {
        self.cascade.and_then(|h| self.nodes.get(&h))
    }

    /// Returns the last-accepted-parent horizon node.
    pub fn last_node(&self) -> Option<&TreeNode> {
        self.last.and_then(|h| self.nodes.get(&h))
    }

    /// Returns the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by block hash.
    pub fn find_node(&self, hash: &TxPowHash) -> Option<&TreeNode> {
        self.nodes.get(hash)
    }

    /// Attach a candidate under its declared parent.
    ///
    /// Rejections are deliberate no-ops, not errors: a duplicate hash
    /// (idempotence), an absent parent (the caller must fetch the
    /// ancestor and retry - nothing is buffered here), or a height at
    /// or below the cascade horizon (stale or adversarial; logged).
    /// Returns true only when the node was attached.
    pub fn insert(&mut self, mut node: TreeNode) -> bool {
        let hash = node.hash();
        if self.nodes.contains_key(&hash) {
            debug!(block = %hash, "Duplicate candidate ignored");
            return false;
        }

        let parent_hash = node.block.parent;
        if !self.nodes.contains_key(&parent_hash) {
            debug!(block = %hash, parent = %parent_hash, "Parent not in tree");
            return false;
        }

        if let Some(cascade) = self.cascade_node() {
            if node.block.number <= cascade.block.number {
                warn!(
                    block = %hash,
                    number = %node.block.number,
                    horizon = %cascade.block.number,
                    "Candidate at or below the cascade horizon rejected"
                );
                return false;
            }
        }

        node.parent = Some(parent_hash);
        self.nodes.insert(hash, node);
        if let Some(parent) = self.nodes.get_mut(&parent_hash) {
            parent.children.push(hash);
        }
        true
    }

    /// Append a node unconditionally, bypassing parent lookup.
    ///
    /// Used during bootstrap and cascade replay, where the caller has
    /// already established strict linear ordering. An empty tree gains
    /// the node as its root; otherwise it goes under the current tip
    /// and the tip advances to it.
    ///
    /// When the node carries a commitment snapshot it is chained onto
    /// the tip's snapshot, but only if the declared parent really is
    /// the tip. In `link_all` mode that is the whole rule; otherwise
    /// the link is also skipped when the tip is already past the
    /// cascade horizon, so pruned commitment state is never carried
    /// forward.
    pub fn hard_add_node(&mut self, mut node: TreeNode, link_all: bool) {
        let Some(tip_hash) = self.tip else {
            self.set_root(node);
            return;
        };

        let hash = node.hash();
        node.parent = Some(tip_hash);

        if let Some(commitment) = node.commitment.as_ref() {
            let tip = &self.nodes[&tip_hash];
            let parent_matches = node.block.parent == tip_hash;
            let linkable = if link_all {
                parent_matches
            } else {
                !tip.is_cascade && parent_matches
            };
            if linkable {
                if let Some(tip_commitment) = tip.commitment.as_ref() {
                    commitment.link_parent(tip_commitment);
                }
            }
        }

        self.nodes.insert(hash, node);
        if let Some(tip) = self.nodes.get_mut(&tip_hash) {
            tip.children.push(hash);
        }
        self.tip = Some(hash);
    }

    /// Move the cascade horizon. Pointer reassignment only - deletion
    /// of the history behind it is a separate compaction step.
    pub fn set_cascade_node(&mut self, hash: TxPowHash) {
        self.cascade = Some(hash);
    }

    /// Move the last-accepted-parent horizon.
    pub fn set_last_node(&mut self, hash: TxPowHash) {
        self.last = Some(hash);
    }

    /// Flag a node and all of its ancestors as at-or-beyond the
    /// pruning horizon.
    pub fn mark_cascade(&mut self, hash: TxPowHash) {
        let mut current = Some(hash);
        while let Some(h) = current {
            match self.nodes.get_mut(&h) {
                Some(node) => {
                    node.is_cascade = true;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    /// Recompute every cumulative weight and re-select the canonical
    /// tip.
    ///
    /// Three passes: reset every total to the node's own weight; walk
    /// the tree and, for each `Valid` node, add its weight to every
    /// ancestor (`Pending` nodes contribute nothing, but their subtrees
    /// are still visited - their descendants may be valid); then
    /// descend from the root to the child with the strictly greatest
    /// total, scanning children in insertion order so the
    /// first-inserted child wins all ties. The leaf reached becomes
    /// the tip.
    ///
    /// Deterministic for a fixed tree shape and fixed validity states:
    /// only each local sibling ordering affects tie-breaking, so the
    /// arrival order of unrelated branches cannot change the outcome.
    pub fn recompute_weights(&mut self) {
        let Some(root) = self.root else {
            return;
        };

        for node in self.nodes.values_mut() {
            node.reset_weight();
        }

        // Upward cascade pass, iterative to survive deep chains
        let mut stack = vec![root];
        while let Some(hash) = stack.pop() {
            let (state, weight, mut current) = {
                let node = &self.nodes[&hash];
                stack.extend(node.children.iter().copied());
                (node.state, node.weight(), node.parent)
            };
            if state != NodeState::Valid {
                continue;
            }
            while let Some(parent_hash) = current {
                let Some(parent) = self.nodes.get_mut(&parent_hash) else {
                    break;
                };
                parent.add_to_total_weight(&weight);
                current = parent.parent;
            }
        }

        // Heaviest-branch descent
        let mut current = root;
        loop {
            let node = &self.nodes[&current];
            if node.children.is_empty() {
                break;
            }
            let mut max = node.children[0];
            for child in &node.children[1..] {
                if self.nodes[child].total_weight > self.nodes[&max].total_weight {
                    max = *child;
                }
            }
            current = max;
        }
        self.tip = Some(current);
    }

    /// The canonical chain as a list of nodes, recomputed from the
    /// current tip on every call. Tip-first by default; `reverse`
    /// yields root-first.
    pub fn chain_list(&self, reverse: bool) -> Vec<&TreeNode> {
        let mut nodes = Vec::new();
        let Some(tip) = self.chain_tip() else {
            return nodes;
        };

        nodes.push(tip);
        let mut current = tip.parent;
        while let Some(hash) = current {
            let Some(node) = self.nodes.get(&hash) else {
                break;
            };
            nodes.push(node);
            current = node.parent;
        }

        if reverse {
            nodes.reverse();
        }
        nodes
    }

    /// Blocks per second over the cascade-to-tip span.
    ///
    /// A coinciding timestamp (tip == cascade, or a degenerate clock)
    /// is reported as [`ChainTreeError::ZeroTimeSpan`] rather than
    /// letting the division misbehave.
    pub fn chain_speed(&self) -> Result<f64, ChainTreeError> {
        let tip = self.chain_tip().ok_or(ChainTreeError::EmptyTree)?;
        let cascade = self.cascade_node().ok_or(ChainTreeError::EmptyTree)?;

        let time_span = tip.block.timestamp.sub(&cascade.block.timestamp);
        if time_span.is_zero() {
            return Err(ChainTreeError::ZeroTimeSpan { tip: tip.hash() });
        }

        let blocks = tip.block.number.sub(&cascade.block.number);
        Ok(blocks.to_f64() / (time_span.to_f64() / 1000.0))
    }

    /// Linear mean of per-block work (2^difficulty) over the canonical
    /// chain strictly after the cascade node, walking back from the
    /// tip. Exactly zero when no block lies in that span. Callers
    /// wanting a difficulty scale apply a log transform themselves.
    pub fn average_difficulty(&self) -> ChainNumber {
        let (Some(tip_hash), Some(cascade_hash)) = (self.tip, self.cascade) else {
            return ChainNumber::zero();
        };

        let mut total = BigInt::zero();
        let mut count = 0u64;
        let mut current = Some(tip_hash);
        while let Some(hash) = current {
            if hash == cascade_hash {
                break;
            }
            let Some(node) = self.nodes.get(&hash) else {
                break;
            };
            total += node.weight();
            count += 1;
            current = node.parent;
        }

        if count == 0 {
            return ChainNumber::zero();
        }
        ChainNumber::from_bigint(total).div(&ChainNumber::from(count))
    }
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}
