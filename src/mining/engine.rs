use chrono::Utc;
use log::{debug, info};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::MinerError;
use super::client::LedgerBoundary;
use super::search::{NonceSearch, SearchOutcome};
use crate::blockchain::Block;
use crate::blockchain::target::difficulty_of;
use crate::error::CryptoError;
use crate::transaction::Transaction;
use crate::wallet::{self, Keypair};

/// How often the head is polled while a search runs.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What every mined block should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiningJob {
    pub block_data: String,
    pub tx_data: String,
    pub receiver: String,
    /// Microquacks; zero means no transfer.
    pub amount: i64,
}

impl MiningJob {
    /// Build a job from command-line style inputs. Without a transfer a
    /// custom message replaces the block data; with one it becomes the
    /// transaction data and the block keeps the default message.
    pub fn new(
        message: Option<String>,
        username: Option<&str>,
        receiver: Option<String>,
        amount: i64,
    ) -> Self {
        let block_data = match username {
            Some(user) => format!("Mined by the official Quack Ledger CLI User: {user}"),
            None => "Mined using the official Quack Ledger CLI".to_string(),
        };
        let (receiver, amount) = match receiver {
            Some(receiver) if amount > 0 => (receiver, amount),
            _ => (String::new(), 0),
        };

        match message {
            Some(message) if amount > 0 => Self {
                block_data,
                tx_data: message,
                receiver,
                amount,
            },
            Some(message) => Self {
                block_data: message,
                tx_data: String::new(),
                receiver,
                amount,
            },
            None => Self {
                block_data,
                tx_data: String::new(),
                receiver,
                amount,
            },
        }
    }

    pub fn is_transfer(&self) -> bool {
        self.amount > 0
    }
}

/// One mining attempt, from fetching the head to the node's answer.
#[derive(Debug)]
enum Attempt {
    Searching(Block),
    Restarting(Block),
    Found(Block),
    Submitted(String),
}

pub struct Miner<B> {
    ledger: B,
    keys: Keypair,
    address: String,
    poll_interval: Duration,
}

impl<B: LedgerBoundary> Miner<B> {
    pub fn new(ledger: B, keys: Keypair) -> Result<Self, CryptoError> {
        let address = keys.address()?;
        Ok(Self {
            ledger,
            keys,
            address,
            poll_interval: POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Mine `blocks` blocks, or forever when `None`. Each node response is
    /// echoed to stdout. Stops at the first network error.
    pub async fn run(&self, job: &MiningJob, blocks: Option<u64>) -> Result<u64, MinerError> {
        let mut mined = 0;
        while blocks.is_none_or(|limit| mined < limit) {
            let response = self.mine_block(job).await?;
            println!("{}", response.trim_end());
            mined += 1;
        }
        Ok(mined)
    }

    /// Run a single attempt to completion and return the node's response.
    pub async fn mine_block(&self, job: &MiningJob) -> Result<String, MinerError> {
        let started = Instant::now();
        let mut state = Attempt::Searching(self.ledger.newest_block().await?);

        loop {
            state = match state {
                Attempt::Searching(head) => match self.search(&head, job).await? {
                    SearchOutcome::Found(block) => Attempt::Found(block),
                    SearchOutcome::Superseded(newer) => Attempt::Restarting(newer),
                    SearchOutcome::Cancelled => return Err(MinerError::Cancelled),
                },
                Attempt::Restarting(head) => {
                    info!("Gotta restart, someone else got block {}", head.index);
                    Attempt::Searching(head)
                }
                Attempt::Found(mut block) => {
                    if job.is_transfer() {
                        block.tx.signature = wallet::sign(&self.keys.private_key, &block.hash)?;
                    }
                    info!(
                        "Block made! It took {:.1?}\n{}",
                        started.elapsed(),
                        serde_json::to_string_pretty(&block).unwrap_or_default()
                    );
                    Attempt::Submitted(self.ledger.submit_block(&block).await?)
                }
                Attempt::Submitted(response) => return Ok(response),
            };
        }
    }

    fn template(&self, head: &Block, job: &MiningJob) -> Block {
        let tx = if job.is_transfer() {
            Transaction {
                data: job.tx_data.clone(),
                sender: self.address.clone(),
                receiver: job.receiver.clone(),
                amount: job.amount,
                public_key: self.keys.public_key.clone(),
                signature: String::new(),
            }
        } else {
            Transaction::none()
        };
        Block::next(
            head,
            Utc::now().timestamp_millis(),
            job.block_data.clone(),
            self.address.clone(),
            tx,
        )
    }

    /// Search on top of `head` on a blocking thread while polling the node.
    /// A new head mined by someone else supersedes the search.
    async fn search(&self, head: &Block, job: &MiningJob) -> Result<SearchOutcome, MinerError> {
        let target = self.ledger.target().await?;
        info!(
            "Mining block #{} on top of {} (difficulty {})",
            head.index + 1,
            head.hash,
            difficulty_of(target)
        );

        let (heads_tx, heads) = watch::channel(head.clone());
        let search = NonceSearch::new(self.template(head, job));
        let mut handle = tokio::task::spawn_blocking(move || search.run(&target, heads));

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seen = head.hash.clone();

        loop {
            tokio::select! {
                joined = &mut handle => {
                    return joined.map_err(|e| MinerError::Task(e.to_string()));
                }
                _ = ticker.tick() => {
                    let latest = match self.ledger.newest_block().await {
                        Ok(block) => block,
                        Err(e) => {
                            drop(heads_tx);
                            let _ = handle.await;
                            return Err(e);
                        }
                    };
                    if latest.hash != seen {
                        seen = latest.hash.clone();
                        if latest.solver != self.address {
                            debug!("head moved to {} by {}", latest.hash, latest.solver);
                            heads_tx.send_replace(latest);
                        }
                    }
                }
            }
        }
    }
}
