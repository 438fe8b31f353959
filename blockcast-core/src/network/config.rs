use crate::error::{BlockcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use web3::types::{Address, H256};

pub const SHARDEUM_CHAIN_ID: u64 = 8119;
pub const SHARDEUM_RPC_URL: &str = "https://api-mezame.shardeum.org";
pub const SHARDEUM_EXPLORER_URL: &str = "https://explorer-mezame.shardeum.org";

/// Blocks after which `blockhash` stops returning the real hash.
pub const REVEAL_WINDOW: u64 = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer_url: Option<String>,
    pub contract_address: Option<Address>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub receipt_poll_interval_ms: u64,
    pub confirmation_timeout_secs: u64,
    pub reveal_window: u64,
    pub gas_limit: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "Shardeum EVM Testnet".to_string(),
            chain_id: SHARDEUM_CHAIN_ID,
            rpc_url: SHARDEUM_RPC_URL.to_string(),
            explorer_url: Some(SHARDEUM_EXPLORER_URL.to_string()),
            contract_address: None,
            poll_interval_secs: 15,
            request_timeout_secs: 10,
            receipt_poll_interval_ms: 1000,
            confirmation_timeout_secs: 120,
            reveal_window: REVEAL_WINDOW,
            gas_limit: None,
        }
    }
}

impl NetworkConfig {
    pub fn shardeum_testnet() -> Self {
        Self::default()
    }

    /// Hardhat / anvil style dev node on localhost.
    pub fn local(chain_id: u64) -> Self {
        Self {
            name: "Local".to_string(),
            chain_id,
            rpc_url: "http://localhost:8545".to_string(),
            explorer_url: None,
            poll_interval_secs: 2,
            confirmation_timeout_secs: 30,
            ..Self::default()
        }
    }

    pub fn with_contract(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(BlockcastError::config("RPC URL cannot be empty"));
        }

        if self.chain_id == 0 {
            return Err(BlockcastError::config("Chain ID must be greater than 0"));
        }

        if self.poll_interval_secs == 0 {
            return Err(BlockcastError::config(
                "Poll interval must be greater than 0",
            ));
        }

        if self.receipt_poll_interval_ms == 0 {
            return Err(BlockcastError::config(
                "Receipt poll interval must be greater than 0",
            ));
        }

        if self.reveal_window == 0 || self.reveal_window > REVEAL_WINDOW {
            return Err(BlockcastError::config(format!(
                "Reveal window must be between 1 and {}",
                REVEAL_WINDOW
            )));
        }

        Ok(())
    }

    pub fn contract_address(&self) -> Result<Address> {
        self.contract_address
            .ok_or_else(|| BlockcastError::config("Contract address is not set"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn tx_url(&self, tx_hash: &H256) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{:?}", base.trim_end_matches('/'), tx_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_is_shardeum() {
        let config = NetworkConfig::default();
        assert_eq!(config.chain_id, 8119);
        assert_eq!(config.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.reveal_window, 256);
        assert!(config.validate().is_ok());
        assert!(config.contract_address().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NetworkConfig::default();
        config.rpc_url.clear();
        assert!(config.validate().is_err());

        let mut config = NetworkConfig::default();
        config.reveal_window = 300;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        let config = NetworkConfig::local(31337).with_contract(Address::repeat_byte(0x42));
        config.save(&path).unwrap();

        let loaded = NetworkConfig::load(&path).unwrap();
        assert_eq!(loaded.chain_id, 31337);
        assert_eq!(loaded.contract_address().unwrap(), Address::repeat_byte(0x42));
    }

    #[test]
    fn test_tx_url() {
        let config = NetworkConfig::default();
        let url = config.tx_url(&H256::zero()).unwrap();
        assert!(url.starts_with("https://explorer-mezame.shardeum.org/tx/0x0000"));
        assert!(NetworkConfig::local(31337).tx_url(&H256::zero()).is_none());
    }
}
