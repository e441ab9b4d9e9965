// Obelisk common library - main library exports

pub mod chain_number;
pub mod hash;
pub mod messages;
pub mod types;

// Flattened re-exports
pub use self::chain_number::ChainNumber;
pub use self::hash::{Hash, TxPowHash};
pub use self::types::*;
