use primitive_types::U256;

use super::model::Balances;
use super::target::hash_meets_target;
use super::{BLOCK_DATA_LIMIT, Block, TX_DATA_LIMIT};
use crate::error::Rejection;
use crate::wallet::{derive_address, verify_signature};

/// Decide whether `candidate` may extend `head`.
///
/// Rules run in a fixed order and the first failure is returned. Balances are
/// the pre-acceptance ones: the candidate's own reward is not spendable yet.
pub fn validate_block(
    candidate: &Block,
    head: &Block,
    balances: &Balances,
    target: &U256,
) -> Result<(), Rejection> {
    let tx = &candidate.tx;

    if tx.amount < 0 {
        return Err(Rejection::NegativeAmount);
    }
    if candidate.index != head.index + 1 {
        return Err(Rejection::WrongIndex {
            expected: head.index + 1,
        });
    }
    if candidate.prev_hash != head.hash {
        return Err(Rejection::WrongPrevHash {
            expected: head.hash.clone(),
        });
    }
    let expected_hash = candidate.compute_hash();
    if candidate.hash != expected_hash {
        return Err(Rejection::HashMismatch {
            expected: expected_hash,
        });
    }
    if !hash_meets_target(&candidate.hash, target) {
        return Err(Rejection::NotASolution);
    }
    if candidate.data.len() > BLOCK_DATA_LIMIT {
        return Err(Rejection::BlockDataTooLarge {
            size: candidate.data.len(),
            limit: BLOCK_DATA_LIMIT,
        });
    }
    if tx.data.len() > TX_DATA_LIMIT {
        return Err(Rejection::TxDataTooLarge {
            size: tx.data.len(),
            limit: TX_DATA_LIMIT,
        });
    }

    if tx.is_transfer() {
        match derive_address(&tx.public_key) {
            Ok(address) if address == tx.sender => {}
            _ => return Err(Rejection::SenderMismatch),
        }
        match verify_signature(&tx.signature, &tx.public_key, &candidate.hash) {
            Ok(true) => {}
            Ok(false) => return Err(Rejection::InvalidSignature),
            Err(e) => return Err(Rejection::MalformedSignature(e)),
        }
        let balance = balances.get(&tx.sender).copied().unwrap_or(0);
        if balance < tx.amount {
            return Err(Rejection::InsufficientBalance {
                balance,
                amount: tx.amount,
            });
        }
    }

    Ok(())
}
