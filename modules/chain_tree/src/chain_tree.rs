//! Obelisk chain-tree module for Caryatid
//! Tracks candidate proof-of-work blocks as a tree and selects the
//! canonical chain by cumulative (GHOST-style) weight

pub mod block_tree;
pub mod tree_error;
pub mod tree_node;

use std::sync::Arc;

use anyhow::Result;
use caryatid_sdk::{module, Context};
use config::Config;
use obelisk_common::{
    messages::{Message, TipAdvancedMessage},
    PowBlock,
};
use tracing::{debug, error, info, warn};

use block_tree::BlockTree;
use tree_node::{NodeState, TreeNode};

const DEFAULT_SUBSCRIBE_BLOCKS_TOPIC: &str = "pow.block.available";
const DEFAULT_SUBSCRIBE_REPLAY_TOPIC: &str = "pow.chain.replay";
const DEFAULT_CLOCK_TICK_TOPIC: &str = "clock.tick";
const DEFAULT_PUBLISH_TIPS_TOPIC: &str = "pow.chain.tip";
const DEFAULT_CASCADE_DEPTH: i64 = 1024;
const DEFAULT_STATUS_TICKS: i64 = 60;

/// Chain tree module
///
/// The tree itself takes no locks; this module's single message loop is
/// the one logical writer, so every mutation happens on one task in
/// arrival order.
#[module(
    message_type(Message),
    name = "chain-tree",
    description = "Block tree and weight-based chain selection"
)]
pub struct ChainTree;

impl ChainTree {
    /// Main init function
    pub async fn init(&self, context: Arc<Context<Message>>, config: Arc<Config>) -> Result<()> {
        // Get configuration
        let subscribe_blocks_topic = config
            .get_string("subscribe-blocks-topic")
            .unwrap_or(DEFAULT_SUBSCRIBE_BLOCKS_TOPIC.to_string());
        info!("Creating blocks subscriber on '{subscribe_blocks_topic}'");

        let subscribe_replay_topic = config
            .get_string("subscribe-replay-topic")
            .unwrap_or(DEFAULT_SUBSCRIBE_REPLAY_TOPIC.to_string());
        info!("Creating replay subscriber on '{subscribe_replay_topic}'");

        let clock_tick_topic =
            config.get_string("clock-tick-topic").unwrap_or(DEFAULT_CLOCK_TICK_TOPIC.to_string());

        let publish_tips_topic = config
            .get_string("publish-tips-topic")
            .unwrap_or(DEFAULT_PUBLISH_TIPS_TOPIC.to_string());
        info!("Publishing tip changes on '{publish_tips_topic}'");

        let cascade_depth =
            config.get_int("cascade-depth").unwrap_or(DEFAULT_CASCADE_DEPTH) as u64;
        info!("Cascade depth {cascade_depth}");

        // Whether commitment snapshots are chained across the cascade
        // horizon during replay
        let link_all = config.get_bool("link-all").unwrap_or(false);
        info!("Commitment link-all mode {link_all}");

        let status_ticks = config.get_int("status-ticks").unwrap_or(DEFAULT_STATUS_TICKS) as u64;

        let mut blocks_subscription = context.subscribe(&subscribe_blocks_topic).await?;
        let mut replay_subscription = context.subscribe(&subscribe_replay_topic).await?;
        let mut clock_subscription = context.subscribe(&clock_tick_topic).await?;

        let mut tree = BlockTree::new();

        context.clone().run(async move {
            loop {
                tokio::select! {
                    result = blocks_subscription.read() => {
                        let Ok((_, message)) = result else {
                            error!("Block message read failed");
                            return;
                        };

                        if let Message::BlockAvailable(available) = message.as_ref() {
                            let advanced = apply_candidate(
                                &mut tree,
                                available.block.clone(),
                                available.valid,
                                cascade_depth,
                            );
                            if let Some(tip) = advanced {
                                let msg = Arc::new(Message::TipAdvanced(tip));
                                context
                                    .message_bus
                                    .publish(&publish_tips_topic, msg)
                                    .await
                                    .unwrap_or_else(|e| error!("Failed to publish: {e}"));
                            }
                        } else {
                            debug!("Ignoring non-BlockAvailable message on blocks topic");
                        }
                    }

                    result = replay_subscription.read() => {
                        let Ok((_, message)) = result else {
                            error!("Replay message read failed");
                            return;
                        };

                        if let Message::ChainReplay(replay) = message.as_ref() {
                            apply_replay(
                                &mut tree,
                                replay.blocks.clone(),
                                replay.cascade,
                                link_all,
                            );
                        } else {
                            debug!("Ignoring non-ChainReplay message on replay topic");
                        }
                    }

                    result = clock_subscription.read() => {
                        let Ok((_, message)) = result else {
                            error!("Clock message read failed");
                            return;
                        };

                        if let Message::Clock(tick) = message.as_ref() {
                            if tick.number.is_multiple_of(status_ticks) {
                                log_chain_status(&tree);
                            }
                        }
                    }
                }
            }
        });

        Ok(())
    }
}

/// Apply one validated candidate to the tree.
///
/// An empty tree is bootstrapped with the candidate as root; otherwise
/// it is inserted under its parent, weights are recomputed and the
/// cascade horizon trails the new tip. Returns a tip advancement to
/// publish when the canonical tip moved.
fn apply_candidate(
    tree: &mut BlockTree,
    block: PowBlock,
    valid: bool,
    cascade_depth: u64,
) -> Option<TipAdvancedMessage> {
    let old_tip = tree.chain_tip().map(|n| n.hash());

    let state = if valid { NodeState::Valid } else { NodeState::Pending };
    let node = TreeNode::new(block, state);

    if tree.is_empty() {
        info!(block = %node.hash(), "Bootstrapping chain root");
        tree.hard_add_node(node, false);
        tree.recompute_weights();
    } else if tree.insert(node) {
        tree.recompute_weights();
        advance_cascade(tree, cascade_depth);
    } else {
        return None;
    }

    let tip = tree.chain_tip()?;
    if Some(tip.hash()) == old_tip {
        return None;
    }
    debug!(tip = %tip.hash(), number = %tip.block.number, "Canonical tip advanced");
    Some(TipAdvancedMessage {
        hash: tip.hash(),
        number: tip.block.number.clone(),
        total_weight: tip.total_weight.to_string(),
    })
}

/// Replay a verified linear segment with `hard_add_node` - the caller
/// (backup or cascade restore) has already established strict ordering.
fn apply_replay(tree: &mut BlockTree, blocks: Vec<PowBlock>, cascade: bool, link_all: bool) {
    let count = blocks.len();
    for block in blocks {
        let mut node = TreeNode::new(block, NodeState::Valid);
        node.is_cascade = cascade;
        tree.hard_add_node(node, link_all);
    }

    // A pre-cascade segment moves the horizon up to its end
    if cascade {
        if let Some(tip_hash) = tree.chain_tip().map(|n| n.hash()) {
            tree.set_cascade_node(tip_hash);
            tree.mark_cascade(tip_hash);
        }
    }

    tree.recompute_weights();
    match tree.chain_tip() {
        Some(tip) => info!(blocks = count, tip = %tip.hash(), "Replayed chain segment"),
        None => warn!("Replayed an empty chain segment"),
    }
}

/// Keep the cascade pointer `depth` blocks behind the canonical tip.
/// The horizon only ever moves forward.
fn advance_cascade(tree: &mut BlockTree, depth: u64) {
    let Some(tip) = tree.chain_tip() else {
        return;
    };

    let mut current = tip.hash();
    for _ in 0..depth {
        match tree.find_node(&current).and_then(|n| n.parent) {
            Some(parent) => current = parent,
            // Chain still shorter than the horizon depth
            None => return,
        }
    }

    if let (Some(candidate), Some(existing)) = (tree.find_node(&current), tree.cascade_node()) {
        if candidate.block.number <= existing.block.number {
            return;
        }
    }

    tree.set_cascade_node(current);
    tree.mark_cascade(current);
}

/// Log chain speed and average difficulty; a zero span just means the
/// chain has no measurable history yet.
fn log_chain_status(tree: &BlockTree) {
    match tree.chain_speed() {
        Ok(speed) => info!(
            blocks_per_sec = speed,
            average_difficulty = %tree.average_difficulty(),
            nodes = tree.len(),
            "Chain status"
        ),
        Err(e) => debug!("Chain status not available yet: {e}"),
    }
}
