//! Durable files for the ledger node.
//!
//! * `blocks.log` holds one compact JSON block per line, append-only, fsync'd
//!   after every append.
//! * `newestblock.json` and `balances.json` are a snapshot of the head and the
//!   balances, replaced atomically (temp file + rename).
//!
//! The log is written before the snapshot. A crash between the two leaves a
//! snapshot that lags the log; [`FileStore::load`] reports that and the caller
//! rebuilds state by replaying the log. A crash in the middle of an append
//! leaves an unterminated last line, which is cut off before the log is read
//! or appended to.

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::blockchain::{Balances, Block, Ledger};
use crate::error::StoreError;

pub const BLOCK_LOG_FILE: &str = "blocks.log";
pub const NEWEST_BLOCK_FILE: &str = "newestblock.json";
pub const BALANCES_FILE: &str = "balances.json";

/// What was found on disk at startup.
#[derive(Debug)]
pub enum Stored {
    /// No block log yet.
    Empty,
    /// Snapshot agrees with the last log record.
    Consistent(Ledger),
    /// Snapshot missing, unreadable, or behind the log; the log is authoritative.
    NeedsReplay { blocks: Vec<Block>, reason: String },
}

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn load(&self) -> Result<Stored, StoreError> {
        let log_path = self.path(BLOCK_LOG_FILE);
        if !log_path.is_file() {
            return Ok(Stored::Empty);
        }
        let torn = self.trim_torn_tail()?;
        let blocks = self.read_blocks()?;
        let last_index = match blocks.last() {
            Some(block) => block.index,
            None => return Err(StoreError::EmptyLog(log_path.display().to_string())),
        };
        if torn {
            return Ok(Stored::NeedsReplay {
                blocks,
                reason: "the last block log record was torn".to_string(),
            });
        }

        let head: Block = match read_json(&self.path(NEWEST_BLOCK_FILE)) {
            Ok(head) => head,
            Err(e) => {
                return Ok(Stored::NeedsReplay {
                    blocks,
                    reason: e.to_string(),
                });
            }
        };
        let balances: Balances = match read_json(&self.path(BALANCES_FILE)) {
            Ok(balances) => balances,
            Err(e) => {
                return Ok(Stored::NeedsReplay {
                    blocks,
                    reason: e.to_string(),
                });
            }
        };
        if head.index != last_index {
            return Ok(Stored::NeedsReplay {
                blocks,
                reason: format!(
                    "snapshot head is block {} but the log ends at block {}",
                    head.index, last_index
                ),
            });
        }
        Ok(Stored::Consistent(Ledger::from_parts(head, balances)))
    }

    /// Start a new log with `ledger.head` (the genesis block) and snapshot it.
    pub fn initialize(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let path = self.path(BLOCK_LOG_FILE);
        let mut line = serde_json::to_vec(&ledger.head).map_err(|e| json_err(&path, e))?;
        line.push(b'\n');
        write_atomic(&path, &line)?;
        self.write_snapshot(ledger)
    }

    /// Persist an accepted block: log record first, then the snapshot.
    pub fn record(&self, ledger: &Ledger) -> Result<(), StoreError> {
        self.append_block(&ledger.head)?;
        self.write_snapshot(ledger)
    }

    pub fn append_block(&self, block: &Block) -> Result<(), StoreError> {
        self.trim_torn_tail()?;
        let path = self.path(BLOCK_LOG_FILE);
        let mut line = serde_json::to_vec(block).map_err(|e| json_err(&path, e))?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.write_all(&line).map_err(|e| io_err(&path, e))?;
        file.sync_all().map_err(|e| io_err(&path, e))
    }

    pub fn write_snapshot(&self, ledger: &Ledger) -> Result<(), StoreError> {
        write_json(&self.path(NEWEST_BLOCK_FILE), &ledger.head)?;
        write_json(&self.path(BALANCES_FILE), &ledger.balances)
    }

    pub fn read_blocks(&self) -> Result<Vec<Block>, StoreError> {
        let path = self.path(BLOCK_LOG_FILE);
        let file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let mut blocks = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| io_err(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            blocks.push(serde_json::from_str(&line).map_err(|e| json_err(&path, e))?);
        }
        Ok(blocks)
    }

    /// Current size of the block log in bytes.
    pub fn log_len(&self) -> Result<u64, StoreError> {
        let path = self.path(BLOCK_LOG_FILE);
        fs::metadata(&path)
            .map(|meta| meta.len())
            .map_err(|e| io_err(&path, e))
    }

    /// The first `upto` bytes of the log as a JSON array, one block per line.
    /// Records are copied as stored, without decoding; a trailing partial
    /// record is left out.
    pub fn render_block_log(&self, upto: u64) -> Result<String, StoreError> {
        let path = self.path(BLOCK_LOG_FILE);
        let file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let mut bytes = Vec::new();
        file.take(upto)
            .read_to_end(&mut bytes)
            .map_err(|e| io_err(&path, e))?;
        bytes.truncate(complete_len(&bytes));
        let text = String::from_utf8(bytes).map_err(|e| {
            io_err(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let mut out = String::with_capacity(text.len() + 4);
        out.push('[');
        for (i, record) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str("\n  ");
            out.push_str(record);
        }
        out.push_str("\n]");
        Ok(out)
    }

    /// Cut an unterminated last line off the log. Returns whether anything was cut.
    fn trim_torn_tail(&self) -> Result<bool, StoreError> {
        let path = self.path(BLOCK_LOG_FILE);
        if !path.is_file() {
            return Ok(false);
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        let len = file.metadata().map_err(|e| io_err(&path, e))?.len();
        if len == 0 {
            return Ok(false);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| io_err(&path, e))?;
        if last[0] == b'\n' {
            return Ok(false);
        }

        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut bytes))
            .map_err(|e| io_err(&path, e))?;
        let keep = complete_len(&bytes) as u64;
        warn!(
            "dropping {} bytes of a torn record at the end of {}",
            len - keep,
            path.display()
        );
        file.set_len(keep).map_err(|e| io_err(&path, e))?;
        file.sync_all().map_err(|e| io_err(&path, e))?;
        Ok(true)
    }
}

/// Length of the prefix of `bytes` that ends with a newline.
fn complete_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |i| i + 1)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let bytes = fs::read(path).map_err(|e| io_err(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| json_err(path, e))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| json_err(path, e))?;
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
    file.write_all(bytes).map_err(|e| io_err(&tmp, e))?;
    file.sync_all().map_err(|e| io_err(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_err(path, e))
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> StoreError {
    StoreError::Json {
        path: path.display().to_string(),
        source,
    }
}
