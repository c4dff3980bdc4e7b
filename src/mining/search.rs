use log::info;
use primitive_types::U256;
use sha2::{Digest, Sha256};
use std::time::Instant;
use tokio::sync::watch;

use crate::blockchain::Block;
use crate::blockchain::target::digest_meets_target;

/// Hashrate is sampled every 2^19 nonces.
pub const REPORT_EVERY: u64 = 1 << 19;

/// How a nonce search ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// `hash` and `solution` are filled in; the signature is not.
    Found(Block),
    /// A competing block became the head; search again on top of it.
    Superseded(Block),
    /// The head sender went away, or the nonce space ran out.
    Cancelled,
}

/// Proof-of-work search over one block template.
///
/// The preimage bytes before the solution are hashed once; each nonce only
/// clones that state and feeds the decimal nonce plus the fixed tail.
pub struct NonceSearch {
    block: Block,
    prefix: Sha256,
    tail: Vec<u8>,
}

impl NonceSearch {
    pub fn new(block: Block) -> Self {
        let (head, tail) = block.preimage_parts();
        let mut prefix = Sha256::new();
        prefix.update(head.as_bytes());
        Self {
            block,
            prefix,
            tail: tail.into_bytes(),
        }
    }

    #[inline]
    fn digest(&self, nonce: u64, buf: &mut [u8; 20]) -> [u8; 32] {
        let mut hasher = self.prefix.clone();
        hasher.update(write_decimal(nonce, buf));
        hasher.update(&self.tail);
        hasher.finalize().into()
    }

    /// Grind nonces from zero until one meets `target`, a newer head is sent
    /// on `heads`, or its sender is dropped.
    pub fn run(self, target: &U256, mut heads: watch::Receiver<Block>) -> SearchOutcome {
        let mut meter = HashrateMeter::new();
        let mut buf = [0u8; 20];

        for nonce in 0..=u64::MAX {
            match heads.has_changed() {
                Ok(false) => {}
                Ok(true) => return SearchOutcome::Superseded(heads.borrow_and_update().clone()),
                Err(_) => return SearchOutcome::Cancelled,
            }
            if nonce & (REPORT_EVERY - 1) == 0 && nonce != 0 {
                meter.sample(nonce);
            }

            let digest = self.digest(nonce, &mut buf);
            if digest_meets_target(&digest, target) {
                let mut block = self.block;
                block.solution = nonce.to_string();
                block.hash = hex::encode(digest);
                debug_assert_eq!(block.hash, block.compute_hash());
                return SearchOutcome::Found(block);
            }
        }
        SearchOutcome::Cancelled
    }
}

/// Decimal digits of `n`, written to the end of `buf`.
#[inline]
fn write_decimal(mut n: u64, buf: &mut [u8; 20]) -> &[u8] {
    let mut pos = buf.len();
    loop {
        pos -= 1;
        buf[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    &buf[pos..]
}

struct HashrateMeter {
    last: Instant,
    shown: f64,
}

impl HashrateMeter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            shown: 0.0,
        }
    }

    fn sample(&mut self, checked: u64) {
        let elapsed = self.last.elapsed().as_secs_f64().max(f64::EPSILON);
        self.last = Instant::now();
        let khs = REPORT_EVERY as f64 / elapsed / 1000.0;

        let arrow = if self.shown - khs > 50.0 {
            self.shown = khs;
            "↓"
        } else if khs - self.shown > 50.0 {
            self.shown = khs;
            "↑"
        } else {
            " "
        };
        info!("{arrow} Rate: {khs:.3} kHashes/s, checked hashes: {checked}");
    }
}
