use clap::Parser;
use log::{error, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use quack_ledger::blockchain::MICROQUACKS_PER_UNIT;
use quack_ledger::mining::{HttpLedger, Miner, MiningJob};
use quack_ledger::wallet::{self, Keypair};

const DEFAULT_URL: &str = "http://127.0.0.1:8080";
const APP_DIR: &str = "quack-ledger";
const PUBKEY_FILE: &str = "pubkey.hex";
const PRIVKEY_FILE: &str = "privkey.hex";
const URL_FILE: &str = "url.txt";

/// Mine blocks for a Quack Ledger node, optionally paying someone with each one.
#[derive(Parser, Debug)]
#[command(name = "quack-miner", version, about)]
struct Args {
    /// How many blocks to mine (default: keep mining)
    blocks: Option<u64>,

    /// Address to send quacks to with every mined block
    #[arg(short = 't', long = "to", value_parser = parse_address)]
    to: Option<String>,

    /// Amount to send per block, in quacks
    #[arg(short, long, default_value_t = 0.0)]
    amount: f64,

    /// Block data, or the transaction data when sending
    #[arg(short, long)]
    message: Option<String>,

    /// Leave the local username out of the default block data
    #[arg(short = 's', long)]
    hide_user: bool,

    /// Node URL (default: url.txt in the config directory)
    #[arg(long)]
    url: Option<String>,
}

fn parse_address(s: &str) -> Result<String, String> {
    if wallet::is_valid_address(s) {
        Ok(s.to_string())
    } else {
        Err(format!(
            "{s:?} is not a valid address (expected {} characters of base64)",
            wallet::ADDRESS_LEN
        ))
    }
}

fn to_microquacks(amount: f64) -> Result<i64, String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount must be a non-negative number, got {amount}"));
    }
    Ok((amount * MICROQUACKS_PER_UNIT as f64).round() as i64)
}

fn config_dir() -> io::Result<PathBuf> {
    let base = dirs::config_dir()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no config directory"))?;
    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Load the keypair from `dir`, creating one on first run.
fn load_or_create_keys(dir: &Path) -> io::Result<Keypair> {
    let pubkey = dir.join(PUBKEY_FILE);
    let privkey = dir.join(PRIVKEY_FILE);
    if privkey.exists() {
        return Keypair::load(&pubkey, &privkey);
    }
    let keys = Keypair::generate();
    keys.save(&pubkey, &privkey)?;
    info!("generated a new keypair in {}", dir.display());
    Ok(keys)
}

/// `--url`, else `url.txt`, which is written with the default when missing.
fn resolve_url(flag: Option<String>, dir: &Path) -> io::Result<String> {
    if let Some(url) = flag {
        return Ok(url);
    }
    let file = dir.join(URL_FILE);
    match fs::read_to_string(&file) {
        Ok(url) if !url.trim().is_empty() => Ok(url.trim().to_string()),
        Ok(_) => {
            warn!("{} is empty, using {DEFAULT_URL}", file.display());
            Ok(DEFAULT_URL.to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::write(&file, DEFAULT_URL)?;
            Ok(DEFAULT_URL.to_string())
        }
        Err(e) => Err(e),
    }
}

fn username() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let amount = match to_microquacks(args.amount) {
        Ok(amount) => amount,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if amount > 0 && args.to.is_none() {
        warn!("--amount given without --to, mining without a transfer");
    }

    let setup = config_dir().and_then(|dir| {
        let keys = load_or_create_keys(&dir)?;
        let url = resolve_url(args.url.clone(), &dir)?;
        Ok((keys, url))
    });
    let (keys, url) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            error!("could not prepare miner settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ledger = match HttpLedger::new(url.as_str()) {
        Ok(ledger) => ledger,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let miner = match Miner::new(ledger, keys) {
        Ok(miner) => miner,
        Err(e) => {
            error!("bad keypair: {e}");
            return ExitCode::FAILURE;
        }
    };

    let user = if args.hide_user { None } else { username() };
    let job = MiningJob::new(args.message, user.as_deref(), args.to, amount);
    info!("mining to {} against {url}", miner.address());

    match miner.run(&job, args.blocks).await {
        Ok(mined) => {
            info!("mined {mined} block(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_convert_to_microquacks() {
        assert_eq!(to_microquacks(0.0), Ok(0));
        assert_eq!(to_microquacks(1.5), Ok(1_500_000));
        assert_eq!(to_microquacks(0.0000004), Ok(0));
        assert!(to_microquacks(-1.0).is_err());
        assert!(to_microquacks(f64::NAN).is_err());
    }

    #[test]
    fn cli_parses_transfer_flags() {
        let address = Keypair::generate().address().unwrap();
        let args = Args::try_parse_from([
            "quack-miner", "3", "-t", address.as_str(), "-a", "2", "-m", "rent", "-s",
        ])
        .unwrap();
        assert_eq!(args.blocks, Some(3));
        assert_eq!(args.to.as_deref(), Some(address.as_str()));
        assert_eq!(args.amount, 2.0);
        assert!(args.hide_user);

        assert!(Args::try_parse_from(["quack-miner", "-t", "short"]).is_err());
    }

    #[test]
    fn url_file_is_created_with_the_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_url(None, dir.path()).unwrap(), DEFAULT_URL);
        assert_eq!(fs::read_to_string(dir.path().join(URL_FILE)).unwrap(), DEFAULT_URL);

        fs::write(dir.path().join(URL_FILE), "http://node:9000\n").unwrap();
        assert_eq!(resolve_url(None, dir.path()).unwrap(), "http://node:9000");
        assert_eq!(
            resolve_url(Some("http://flag".into()), dir.path()).unwrap(),
            "http://flag"
        );
    }

    #[test]
    fn keys_persist_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let first = load_or_create_keys(dir.path()).unwrap();
        let second = load_or_create_keys(dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
