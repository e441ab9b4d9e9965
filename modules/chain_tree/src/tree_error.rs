//! Error types for chain tree operations.

use obelisk_common::TxPowHash;

/// Errors returned by [`BlockTree`](crate::block_tree::BlockTree)
/// metric operations.
///
/// Insertion outcomes are deliberately booleans, not errors: duplicate,
/// orphan and stale candidates are expected network noise and the tree
/// is idempotent under them.
#[derive(Debug, thiserror::Error)]
pub enum ChainTreeError {
    /// The tree has no root yet.
    #[error("tree is empty")]
    EmptyTree,

    /// Tip and cascade node carry the same timestamp, so there is no
    /// span to measure over - "no data yet", not a division failure.
    #[error("zero time span between cascade node and tip {tip}")]
    ZeroTimeSpan { tip: TxPowHash },
}
