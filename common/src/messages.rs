//! Definition of Obelisk messages

// These messages are only constructed by the modules, not in here
#![allow(dead_code)]

use crate::types::PowBlock;
use crate::{ChainNumber, TxPowHash};

// Caryatid core messages
use caryatid_module_clock::messages::ClockTickMessage;

/// Validated candidate block message
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct BlockAvailableMessage {
    /// The candidate block
    pub block: PowBlock,

    /// Verdict from the upstream validation pipeline
    pub valid: bool,
}

/// Verified linear chain segment, replayed at bootstrap
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainReplayMessage {
    /// Blocks in strict parent-before-child order
    pub blocks: Vec<PowBlock>,

    /// Whether this segment lies at or beyond the pruning horizon
    pub cascade: bool,
}

/// Canonical tip movement message
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct TipAdvancedMessage {
    /// Hash of the new tip
    pub hash: TxPowHash,

    /// Its block number
    pub number: ChainNumber,

    /// Cumulative weight of the winning branch, in decimal
    pub total_weight: String,
}

// === Global message enum ===
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Message {
    None(()),                                  // Just so we have a simple default

    // Generic messages, get of jail free cards
    String(String),                            // Simple string
    JSON(serde_json::Value),                   // JSON object

    // Caryatid standard messages
    Clock(ClockTickMessage),                   // Clock tick

    // Chain messages
    BlockAvailable(BlockAvailableMessage),     // Validated candidate block
    ChainReplay(ChainReplayMessage),           // Verified segment for bootstrap
    TipAdvanced(TipAdvancedMessage),           // Canonical tip moved
}

impl Default for Message {
    fn default() -> Self {
        Self::None(())
    }
}

// Casts from specific messages
impl From<ClockTickMessage> for Message {
    fn from(msg: ClockTickMessage) -> Self {
        Message::Clock(msg)
    }
}

impl From<BlockAvailableMessage> for Message {
    fn from(msg: BlockAvailableMessage) -> Self {
        Message::BlockAvailable(msg)
    }
}

impl From<ChainReplayMessage> for Message {
    fn from(msg: ChainReplayMessage) -> Self {
        Message::ChainReplay(msg)
    }
}

impl From<TipAdvancedMessage> for Message {
    fn from(msg: TipAdvancedMessage) -> Self {
        Message::TipAdvanced(msg)
    }
}
