//! Environment-based Configuration
//!
//! Settings are read from environment variables (a `.env` file is loaded
//! first by the binary).
//!
//! - `SETTLEMENT_NETWORK` - "mainnet", "testnet" or "regtest" (default: "regtest")
//! - `SETTLEMENT_DUST_THRESHOLD_SATS` - Incoming outputs below this are ignored (default: 5000)
//! - `SETTLEMENT_DEPOSIT_FEE_SATS` - Fee withheld from incoming deposits (default: 0)
//! - `SETTLEMENT_LOG_LEVEL` - Logging level (debug, info, warn, error)
//! - `SETTLEMENT_LOG_JSON` - "1" for JSON logs, "0" for pretty logs (default: JSON on mainnet)

use std::env;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_DUST_THRESHOLD_SATS: u64 = 5_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Bitcoin network the watcher reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "regtest" | "reg" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "SETTLEMENT_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

/// Settlement core configuration
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub network: Network,
    pub dust_threshold_sats: u64,
    pub deposit_fee_sats: u64,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            network: Network::Regtest,
            dust_threshold_sats: DEFAULT_DUST_THRESHOLD_SATS,
            deposit_fee_sats: 0,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl SettlementConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: Network = env::var("SETTLEMENT_NETWORK")
            .unwrap_or_else(|_| "regtest".to_string())
            .parse()?;

        let dust_threshold_sats =
            parse_sats_var("SETTLEMENT_DUST_THRESHOLD_SATS", DEFAULT_DUST_THRESHOLD_SATS)?;
        let deposit_fee_sats = parse_sats_var("SETTLEMENT_DEPOSIT_FEE_SATS", 0)?;

        let log_level = env::var("SETTLEMENT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_json = env::var("SETTLEMENT_LOG_JSON")
            .map(|v| v == "1")
            .unwrap_or(network == Network::Mainnet);

        Ok(Self {
            network,
            dust_threshold_sats,
            deposit_fee_sats,
            log_level,
            log_json,
        })
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== Settlement Configuration ===");
        println!("Network: {:?}", self.network);
        println!("Dust threshold: {} sats", self.dust_threshold_sats);
        println!("Deposit fee: {} sats", self.deposit_fee_sats);
        println!("Log Level: {}", self.log_level);
        println!("JSON logs: {}", self.log_json);
        println!("================================");
    }
}

fn parse_sats_var(var_name: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var_name) {
        Ok(value) => value.trim().replace('_', "").parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), format!("not a sats amount: {}", value))
        }),
        Err(_) => Ok(default),
    }
}
