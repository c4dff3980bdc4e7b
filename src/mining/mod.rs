//! Client-side mining: fetch the head and target from a node, grind a
//! nonce, restart when someone else extends the chain, sign and submit.

pub mod client;
pub mod engine;
pub mod search;

pub use client::{HttpLedger, LedgerBoundary};
pub use engine::{Miner, MiningJob};
pub use search::{NonceSearch, SearchOutcome};

use thiserror::Error;

use crate::error::{CryptoError, TargetError};

#[derive(Debug, Error)]
pub enum MinerError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {url}: {reason}")]
    Protocol { url: String, reason: String },

    #[error("node published an unusable target: {0}")]
    Target(#[from] TargetError),

    #[error("could not sign block: {0}")]
    Crypto(#[from] CryptoError),

    #[error("search task failed: {0}")]
    Task(String),

    #[error("nonce search ended without a solution")]
    Cancelled,
}
