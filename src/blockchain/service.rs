use log::{error, info, warn};
use primitive_types::U256;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::target::publish_target;
use super::{Balances, Block, Ledger, validate_block};
use crate::error::{Rejection, StoreError, TargetError};
use crate::storage::{FileStore, Stored};

/// The single ledger authority: owns the chain head, the balances and the
/// target, and serializes every submission.
#[derive(Debug)]
pub struct ChainService {
    ledger: Mutex<Ledger>,
    target: RwLock<U256>,
    store: FileStore,
}

impl ChainService {
    /// Bootstrap from `store`: create the genesis block on first start,
    /// otherwise load the snapshot (replaying the block log when it lags).
    pub fn open(store: FileStore, target: U256) -> Result<Self, StoreError> {
        let ledger = match store.load()? {
            Stored::Empty => {
                let ledger = Ledger::new();
                store.initialize(&ledger)?;
                info!(
                    "created genesis block {} in {}",
                    ledger.head.hash,
                    store.dir().display()
                );
                ledger
            }
            Stored::Consistent(ledger) => {
                info!(
                    "loaded ledger at block {} ({} addresses)",
                    ledger.head.index,
                    ledger.balances.len()
                );
                ledger
            }
            Stored::NeedsReplay { blocks, reason } => {
                warn!("snapshot is out of date ({reason}), replaying the block log");
                let ledger = Ledger::replay(blocks).ok_or_else(|| {
                    StoreError::EmptyLog(store.dir().display().to_string())
                })?;
                store.write_snapshot(&ledger)?;
                info!("replayed ledger up to block {}", ledger.head.index);
                ledger
            }
        };

        Ok(Self {
            ledger: Mutex::new(ledger),
            target: RwLock::new(target),
            store,
        })
    }

    /// Validate `candidate` against the current head and, if it passes, apply
    /// and persist it. The whole sequence runs under one lock.
    pub fn submit_block(&self, candidate: Block) -> Result<(), Rejection> {
        let mut ledger = self.ledger.lock().expect("mutex poisoned");
        let target = self.target();

        if let Err(reason) = validate_block(&candidate, &ledger.head, &ledger.balances, &target) {
            warn!("rejected block #{} from {}: {}", candidate.index, candidate.solver, reason);
            return Err(reason);
        }

        let (index, hash, solver) = (
            candidate.index,
            candidate.hash.clone(),
            candidate.solver.clone(),
        );
        ledger.apply(candidate);

        if let Err(e) = self.store.record(&ledger) {
            error!(
                "block #{index} accepted but not persisted, in-memory state is ahead of disk: {e}"
            );
        }
        info!("accepted block #{index} (hash={hash}, solver={solver})");
        Ok(())
    }

    pub fn head(&self) -> Block {
        self.ledger.lock().expect("mutex poisoned").head.clone()
    }

    pub fn balances(&self) -> Balances {
        self.ledger.lock().expect("mutex poisoned").balances.clone()
    }

    pub fn display_balances(&self) -> HashMap<String, f64> {
        self.ledger.lock().expect("mutex poisoned").display_balances()
    }

    pub fn target(&self) -> U256 {
        *self.target.read().expect("rwlock poisoned")
    }

    /// Replace the target. Takes effect for the next submission. A target
    /// that `/difficulty` could not publish is refused.
    pub fn set_target(&self, target: U256) -> Result<(), TargetError> {
        publish_target(target)?;
        *self.target.write().expect("rwlock poisoned") = target;
        info!("target set to {target:x}");
        Ok(())
    }

    /// The target as served on `/difficulty`.
    pub fn published_target(&self) -> Result<String, TargetError> {
        publish_target(self.target())
    }

    /// All accepted blocks as a JSON array. Only the log length is read under
    /// the ledger lock, so it ends on a record boundary; rendering runs
    /// without it.
    pub fn block_log(&self) -> Result<String, StoreError> {
        let len = {
            let _ledger = self.ledger.lock().expect("mutex poisoned");
            self.store.log_len()?
        };
        self.store.render_block_log(len)
    }
}
