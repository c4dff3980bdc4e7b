//! Difficulty / target arithmetic and the textual form the node publishes.
//!
//! A hash, read as a 256-bit big-endian integer, is a valid proof iff it is
//! `<=` the target. The node publishes the target as lowercase hexadecimal and
//! miners parse that text back; the published text must consist of decimal
//! digit characters only, so not every target is publishable.

use primitive_types::U256;

use crate::error::TargetError;

/// Largest value a SHA-256 digest can take.
pub const MAX_HASH_VALUE: U256 = U256::MAX;

/// Default target, 2^236 (about one valid hash in a million).
pub const DEFAULT_TARGET_HEX: &str =
    "0000100000000000000000000000000000000000000000000000000000000000";

/// `target = MaxHashValue / difficulty`.
pub fn target_from_difficulty(difficulty: u64) -> Result<U256, TargetError> {
    if difficulty == 0 {
        return Err(TargetError::ZeroDifficulty);
    }
    Ok(MAX_HASH_VALUE / U256::from(difficulty))
}

/// Expected number of hashes per valid block for `target`.
pub fn difficulty_of(target: U256) -> U256 {
    if target.is_zero() {
        return MAX_HASH_VALUE;
    }
    MAX_HASH_VALUE / target
}

/// Parse a hex target, as written in configuration (leading zeros allowed).
pub fn parse_hex_target(text: &str) -> Result<U256, TargetError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TargetError::Empty);
    }
    U256::from_str_radix(text, 16).map_err(|_| TargetError::Unparsable(text.to_string()))
}

/// Text served on `/difficulty`.
pub fn publish_target(target: U256) -> Result<String, TargetError> {
    let text = format!("{target:x}");
    if !text.bytes().all(|c| c.is_ascii_digit()) {
        return Err(TargetError::NonDecimalDigits(text));
    }
    Ok(text)
}

/// Largest publishable target that is `<= target`: the first non-decimal hex
/// digit and everything after it become `9`.
pub fn round_down_to_publishable(target: U256) -> U256 {
    let text = format!("{target:x}");
    let Some(cut) = text.bytes().position(|c| !c.is_ascii_digit()) else {
        return target;
    };
    let rounded = format!("{}{}", &text[..cut], "9".repeat(text.len() - cut));
    U256::from_str_radix(&rounded, 16).unwrap_or(target)
}

/// Miner-side inverse of [`publish_target`].
pub fn parse_published_target(text: &str) -> Result<U256, TargetError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TargetError::Empty);
    }
    if !text.bytes().all(|c| c.is_ascii_digit()) {
        return Err(TargetError::NonDecimalDigits(text.to_string()));
    }
    U256::from_str_radix(text, 16).map_err(|_| TargetError::Unparsable(text.to_string()))
}

/// Hot-path check on a raw digest.
#[inline]
pub fn digest_meets_target(digest: &[u8], target: &U256) -> bool {
    U256::from_big_endian(digest) <= *target
}

/// Check a hex block hash; anything that is not 64 hex digits fails.
pub fn hash_meets_target(hash_hex: &str, target: &U256) -> bool {
    if hash_hex.len() != 64 {
        return false;
    }
    match hex::decode(hash_hex) {
        Ok(bytes) => digest_meets_target(&bytes, target),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};

    #[test]
    fn target_is_inverse_of_difficulty() {
        assert_eq!(target_from_difficulty(1).unwrap(), U256::MAX);
        assert_eq!(target_from_difficulty(2).unwrap(), U256::MAX / 2);
        assert!(target_from_difficulty(1000).unwrap() < target_from_difficulty(999).unwrap());
        assert_eq!(target_from_difficulty(0), Err(TargetError::ZeroDifficulty));
    }

    #[test]
    fn default_target_is_publishable() {
        let target = parse_hex_target(DEFAULT_TARGET_HEX).unwrap();
        assert_eq!(target, U256::from(2).pow(U256::from(236)));
        let text = publish_target(target).unwrap();
        assert!(text.starts_with('1'));
        assert_eq!(text.len(), 60);
        assert_eq!(parse_published_target(&text).unwrap(), target);
        assert_eq!(difficulty_of(target), U256::from(1u64 << 20) - U256::one());
    }

    #[test]
    fn non_decimal_targets_cannot_be_published() {
        let target = target_from_difficulty(1 << 20).unwrap();
        assert!(matches!(
            publish_target(target),
            Err(TargetError::NonDecimalDigits(_))
        ));
        assert!(matches!(
            parse_published_target("10ab"),
            Err(TargetError::NonDecimalDigits(_))
        ));
        assert_eq!(parse_published_target("  "), Err(TargetError::Empty));
    }

    #[test]
    fn rounding_down_yields_the_largest_publishable_target() {
        let rounded = round_down_to_publishable(parse_hex_target("12a4").unwrap());
        assert_eq!(rounded, parse_hex_target("1299").unwrap());
        let max = round_down_to_publishable(U256::MAX);
        assert_eq!(publish_target(max).unwrap(), "9".repeat(64));
        let already = parse_hex_target("1000").unwrap();
        assert_eq!(round_down_to_publishable(already), already);
    }

    #[test]
    fn published_text_round_trips() {
        for hex_text in ["1", "10", "99", "123456789", "9000000000000"] {
            let target = parse_hex_target(hex_text).unwrap();
            let text = publish_target(target).unwrap();
            assert_eq!(text, hex_text);
            assert_eq!(parse_published_target(&text).unwrap(), target);
        }
    }

    #[test]
    fn hash_comparison_is_inclusive() {
        let target = U256::from(0x10u64);
        let mut digest = [0u8; 32];
        digest[31] = 0x10;
        assert!(digest_meets_target(&digest, &target));
        digest[31] = 0x11;
        assert!(!digest_meets_target(&digest, &target));
        assert!(hash_meets_target(&hex::encode([0u8; 32]), &U256::zero()));
    }

    #[test]
    fn malformed_hash_never_meets_target() {
        assert!(!hash_meets_target("abc", &U256::MAX));
        assert!(!hash_meets_target(&"zz".repeat(32), &U256::MAX));
    }

    #[test]
    fn smaller_target_accepts_a_subset() {
        let easy = target_from_difficulty(4).unwrap();
        let hard = target_from_difficulty(64).unwrap();
        for nonce in 0u32..512 {
            let digest = Sha256::digest(nonce.to_be_bytes());
            if digest_meets_target(&digest, &hard) {
                assert!(digest_meets_target(&digest, &easy));
            }
        }
    }
}
