use thiserror::Error;

/// Why a submitted block was turned down. `Display` is the reason sent back
/// to the submitter, so every variant names the rule that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Amount is negative")]
    NegativeAmount,
    #[error("Index should be {expected}")]
    WrongIndex { expected: u64 },
    #[error("PrevHash should be {expected}")]
    WrongPrevHash { expected: String },
    #[error(
        "Block hash is incorrect (expected {expected}). This usually happens if your difficulty is set incorrectly. Restart your miner."
    )]
    HashMismatch { expected: String },
    #[error("Block is not a solution (hash is above the current target)")]
    NotASolution,
    #[error("Block's data field is too large ({size} bytes, limit is {limit})")]
    BlockDataTooLarge { size: usize, limit: usize },
    #[error("Transaction's data field is too large ({size} bytes, limit is {limit})")]
    TxDataTooLarge { size: usize, limit: usize },
    #[error("Pubkey does not match sender address")]
    SenderMismatch,
    #[error("Signature could not be checked: {0}")]
    MalformedSignature(CryptoError),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Insufficient balance ({balance} microquacks available, {amount} requested)")]
    InsufficientBalance { balance: i64, amount: i64 },
}

/// Malformed key or signature material, or a broken entropy source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid pubkey hex")]
    PubkeyHex,
    #[error("invalid pubkey bytes")]
    PubkeyBytes,
    #[error("invalid private key")]
    PrivateKey,
    #[error("invalid signature hex")]
    SignatureHex,
    #[error("invalid DER signature")]
    SignatureDer,
    #[error("invalid message digest")]
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("difficulty must be greater than zero")]
    ZeroDifficulty,
    #[error("target text is empty")]
    Empty,
    #[error("target {0} contains a non-decimal digit and cannot be published")]
    NonDecimalDigits(String),
    #[error("target {0} is not a valid 256-bit number")]
    Unparsable(String),
}

/// Durable write or read failure. In-memory state stays authoritative when
/// one of these happens after a block was accepted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("block log {0} is empty")]
    EmptyLog(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port {0:?}")]
    Port(String),
    #[error("no ports configured")]
    NoPorts,
    #[error("invalid difficulty {0:?}")]
    Difficulty(String),
    #[error(transparent)]
    Target(#[from] TargetError),
}
