use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::transaction::Transaction;

/// `prevHash` of the genesis block.
pub const GENESIS_PREV_HASH: &str = "🐤";

/// Fixed genesis timestamp (Unix ms) so every fresh ledger shares one genesis hash.
pub const GENESIS_TIMESTAMP: i64 = 1_633_046_400_000;

const GENESIS_DATA: &str =
    "Genesis block. Every quack starts somewhere, and the ledger starts here.";
const GENESIS_SOLUTION: &str = "Quack! The first block needs no proof of work.";
const GENESIS_SOLVER: &str = "The Quack Ledger";

/// A single block in the chain, carrying at most one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Block {
    pub index: u64,
    /// Capture time, Unix milliseconds. Informational only.
    pub timestamp: i64,
    pub data: String,
    /// Cached canonical hash of the other fields.
    pub hash: String,
    pub prev_hash: String,
    /// Proof-of-work nonce in decimal.
    pub solution: String,
    /// Address credited with the block reward.
    pub solver: String,
    pub tx: Transaction,
}

impl Block {
    /// The genesis block: fixed content, sentinel `prevHash`, no transaction.
    pub fn genesis() -> Self {
        let mut block = Self {
            index: 0,
            timestamp: GENESIS_TIMESTAMP,
            data: GENESIS_DATA.to_string(),
            hash: String::new(),
            prev_hash: GENESIS_PREV_HASH.to_string(),
            solution: GENESIS_SOLUTION.to_string(),
            solver: GENESIS_SOLVER.to_string(),
            tx: Transaction::none(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Start a successor of `prev` with an empty solution and hash.
    pub fn next(prev: &Block, timestamp: i64, data: String, solver: String, tx: Transaction) -> Self {
        Self {
            index: prev.index + 1,
            timestamp,
            data,
            hash: String::new(),
            prev_hash: prev.hash.clone(),
            solution: String::new(),
            solver,
            tx: tx.normalized(),
        }
    }

    /// Preimage bytes before and after the `solution` field.
    ///
    /// The canonical preimage is `index:timestamp:data:prevHash:solution:`
    /// followed by `solver:tx.data:tx.sender:tx.receiver:tx.amount:tx.publicKey`.
    /// `hash` and `tx.signature` are never part of it. Splitting around the
    /// solution lets the miner hash the fixed prefix once per attempt.
    pub fn preimage_parts(&self) -> (String, String) {
        let head = format!(
            "{}:{}:{}:{}:",
            self.index, self.timestamp, self.data, self.prev_hash
        );
        let tail = format!(
            ":{}:{}:{}:{}:{}:{}",
            self.solver,
            self.tx.data,
            self.tx.sender,
            self.tx.receiver,
            self.tx.amount,
            self.tx.public_key
        );
        (head, tail)
    }

    /// SHA-256 of the canonical preimage, lowercase hex.
    pub fn compute_hash(&self) -> String {
        let (head, tail) = self.preimage_parts();
        let mut hasher = Sha256::new();
        hasher.update(head.as_bytes());
        hasher.update(self.solution.as_bytes());
        hasher.update(tail.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the cached `hash` matches the content.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }
}
