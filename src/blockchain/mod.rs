pub mod block;
pub mod model;
pub mod service;
pub mod target;
pub mod validation;

pub use block::Block;
pub use model::{Balances, Ledger};
pub use service::ChainService;
pub use validation::validate_block;

/// 1 display unit = 1,000,000 microquacks.
pub const MICROQUACKS_PER_UNIT: i64 = 1_000_000;

/// Issuance credited to the solver of a block without a transfer.
pub const REWARD: i64 = MICROQUACKS_PER_UNIT;

/// Upper bound on `block.data`, in bytes.
pub const BLOCK_DATA_LIMIT: usize = 250_000;

/// Upper bound on `block.tx.data`, in bytes.
pub const TX_DATA_LIMIT: usize = 250_000;
