use std::collections::HashMap;

use super::{Block, REWARD};

/// Address → microquack balance. A missing address has balance 0.
pub type Balances = HashMap<String, i64>;

/// Chain head plus the balance ledger. Only [`Ledger::apply`] mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    pub head: Block,
    pub balances: Balances,
}

impl Ledger {
    /// Fresh ledger whose head is the genesis block.
    pub fn new() -> Self {
        Self {
            head: Block::genesis(),
            balances: Balances::new(),
        }
    }

    pub fn from_parts(head: Block, balances: Balances) -> Self {
        Self { head, balances }
    }

    pub fn balance_of(&self, address: &str) -> i64 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Apply an already validated block.
    ///
    /// The solver is credited the reward; a transfer block takes that reward
    /// back, then moves `amount` from sender to receiver.
    pub fn apply(&mut self, block: Block) {
        *self.balances.entry(block.solver.clone()).or_insert(0) += REWARD;
        if block.tx.is_transfer() {
            let tx = &block.tx;
            *self.balances.entry(block.solver.clone()).or_insert(0) -= REWARD;
            *self.balances.entry(tx.sender.clone()).or_insert(0) -= tx.amount;
            *self.balances.entry(tx.receiver.clone()).or_insert(0) += tx.amount;
        }
        self.head = block;
    }

    /// Rebuild head and balances from a block log starting at genesis.
    /// Blocks are trusted: they were validated when first accepted.
    pub fn replay<I>(blocks: I) -> Option<Self>
    where
        I: IntoIterator<Item = Block>,
    {
        let mut blocks = blocks.into_iter();
        let genesis = blocks.next()?;
        let mut ledger = Self::from_parts(genesis, Balances::new());
        for block in blocks {
            ledger.apply(block);
        }
        Some(ledger)
    }

    /// Balances in display units (microquacks / 1,000,000).
    pub fn display_balances(&self) -> HashMap<String, f64> {
        self.balances
            .iter()
            .map(|(address, micro)| (address.clone(), to_display_units(*micro)))
            .collect()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

pub fn to_display_units(microquacks: i64) -> f64 {
    microquacks as f64 / super::MICROQUACKS_PER_UNIT as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    fn block_by(solver: &str, tx: Transaction) -> Block {
        let mut b = Block::next(&Block::genesis(), 0, String::new(), solver.into(), tx);
        b.hash = b.compute_hash();
        b
    }

    fn transfer(sender: &str, receiver: &str, amount: i64) -> Transaction {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            ..Transaction::none()
        }
    }

    #[test]
    fn plain_block_credits_exactly_the_reward() {
        let mut ledger = Ledger::new();
        ledger.balances.insert("bystander".into(), 7);
        let block = block_by("miner", Transaction::none());
        ledger.apply(block.clone());

        assert_eq!(ledger.balance_of("miner"), REWARD);
        assert_eq!(ledger.balance_of("bystander"), 7);
        assert_eq!(ledger.balances.len(), 2);
        assert_eq!(ledger.head, block);
    }

    #[test]
    fn transfer_block_moves_funds_and_reclaims_reward() {
        let mut ledger = Ledger::new();
        ledger.balances.insert("alice".into(), 10_000_000);
        ledger.apply(block_by("miner", transfer("alice", "bob", 2_000_000)));

        assert_eq!(ledger.balance_of("alice"), 8_000_000);
        assert_eq!(ledger.balance_of("bob"), 2_000_000);
        assert_eq!(ledger.balance_of("miner"), 0);
    }

    #[test]
    fn self_transfer_only_reclaims_the_reward() {
        let mut ledger = Ledger::new();
        ledger.balances.insert("alice".into(), 3_000_000);
        ledger.apply(block_by("alice", transfer("alice", "alice", 1_000_000)));
        assert_eq!(ledger.balance_of("alice"), 3_000_000);
    }

    #[test]
    fn replay_rebuilds_state() {
        let genesis = Block::genesis();
        let first = block_by("miner", Transaction::none());
        let mut live = Ledger::new();
        live.apply(first.clone());

        let replayed = Ledger::replay(vec![genesis, first]).unwrap();
        assert_eq!(replayed, live);
        assert!(Ledger::replay(Vec::new()).is_none());
    }

    #[test]
    fn display_units() {
        let mut ledger = Ledger::new();
        ledger.balances.insert("a".into(), 1_500_000);
        assert_eq!(ledger.display_balances()["a"], 1.5);
    }
}
