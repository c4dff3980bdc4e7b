use primitive_types::U256;
use std::path::PathBuf;

use crate::blockchain::target::{
    DEFAULT_TARGET_HEX, parse_hex_target, publish_target, round_down_to_publishable,
    target_from_difficulty,
};
use crate::error::ConfigError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORTS: &str = "8080,80";

/// Ledger node settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub host: String,
    /// Every port serves the same routes against the same ledger.
    pub ports: Vec<u16>,
    pub data_dir: PathBuf,
    pub target: U256,
}

impl NodeConfig {
    /// Read `HOST`, `PORTS`, `DATA_DIR`, `TARGET` / `DIFFICULTY` from the
    /// process environment (a `.env` file is loaded first when present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let ports = parse_ports(&lookup("PORTS").unwrap_or_else(|| DEFAULT_PORTS.to_string()))?;
        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let target = match (lookup("TARGET"), lookup("DIFFICULTY")) {
            (Some(hex), _) => parse_hex_target(&hex)?,
            (None, Some(difficulty)) => {
                let difficulty: u64 = difficulty
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Difficulty(difficulty.clone()))?;
                round_down_to_publishable(target_from_difficulty(difficulty)?)
            }
            (None, None) => parse_hex_target(DEFAULT_TARGET_HEX)?,
        };
        // miners can only read targets whose hex form is all decimal digits
        publish_target(target)?;

        Ok(Self {
            host,
            ports,
            data_dir,
            target,
        })
    }
}

fn parse_ports(list: &str) -> Result<Vec<u16>, ConfigError> {
    let ports = list
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u16>().map_err(|_| ConfigError::Port(p.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    if ports.is_empty() {
        return Err(ConfigError::NoPorts);
    }
    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TargetError;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<NodeConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.ports, vec![8080, 80]);
        assert_eq!(cfg.data_dir, PathBuf::from("."));
        assert_eq!(cfg.target, parse_hex_target(DEFAULT_TARGET_HEX).unwrap());
    }

    #[test]
    fn explicit_values() {
        let cfg = config(&[
            ("HOST", "127.0.0.1"),
            ("PORTS", "9000, 9001"),
            ("DATA_DIR", "/tmp/ledger"),
            ("TARGET", "00ff00"),
        ]);
        // 0xff00 contains non-decimal digits
        assert!(matches!(
            cfg,
            Err(ConfigError::Target(TargetError::NonDecimalDigits(_)))
        ));

        let cfg = config(&[("PORTS", "9000, 9001"), ("TARGET", "0099")]).unwrap();
        assert_eq!(cfg.ports, vec![9000, 9001]);
        assert_eq!(cfg.target, U256::from(0x99u64));
    }

    #[test]
    fn difficulty_is_rounded_to_a_publishable_target() {
        // MaxHash / 1 is all f's, rounded down to all 9's
        let cfg = config(&[("DIFFICULTY", "1")]).unwrap();
        assert_eq!(publish_target(cfg.target).unwrap(), "9".repeat(64));
        let cfg = config(&[("DIFFICULTY", "1048576")]).unwrap();
        assert!(cfg.target <= target_from_difficulty(1 << 20).unwrap());
        assert!(publish_target(cfg.target).is_ok());
        assert!(matches!(
            config(&[("DIFFICULTY", "lots")]),
            Err(ConfigError::Difficulty(_))
        ));
    }

    #[test]
    fn bad_ports() {
        assert!(matches!(config(&[("PORTS", "80,http")]), Err(ConfigError::Port(_))));
        assert!(matches!(config(&[("PORTS", " , ")]), Err(ConfigError::NoPorts)));
    }
}
