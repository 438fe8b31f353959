use anyhow::{Context, Result};
use blockcast_core::types::parse_address;
use blockcast_core::NetworkConfig;
use std::path::{Path, PathBuf};

pub const NETWORK_FILE: &str = "network.json";
pub const DATABASE_FILE: &str = "blockcast.db";

/// Values given on the command line that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub contract: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub network: NetworkConfig,
}

impl CliConfig {
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blockcast")
    }

    /// Explicit `--config` file, else `<data_dir>/network.json`, else the
    /// built-in Shardeum testnet profile.
    pub fn load(
        data_dir: PathBuf,
        config_path: Option<&Path>,
        overrides: Overrides,
    ) -> Result<Self> {
        let default_path = data_dir.join(NETWORK_FILE);
        let mut network = match config_path {
            Some(path) => NetworkConfig::load(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None if default_path.exists() => NetworkConfig::load(&default_path)
                .with_context(|| format!("Failed to load {}", default_path.display()))?,
            None => NetworkConfig::default(),
        };

        if let Some(rpc_url) = overrides.rpc_url {
            network.rpc_url = rpc_url;
        }
        if let Some(contract) = overrides.contract {
            network.contract_address = Some(parse_address(&contract)?);
        }
        network.validate()?;

        Ok(Self { data_dir, network })
    }

    pub fn network_path(&self) -> PathBuf {
        self.data_dir.join(NETWORK_FILE)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}
