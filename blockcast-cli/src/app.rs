use crate::config::CliConfig;
use anyhow::{Context, Result};
use blockcast_core::network::{key_address, parse_signing_key};
use blockcast_core::{
    Address, NetworkConfig, PredictionStore, RpcChainReader, SecretKey, Session, Storage,
    Web3Gateway,
};
use blockcast_protocol::{InFlightGuards, PredictionSubmitter, RevealEngine};
use std::sync::Arc;

/// Everything a command needs, built once per invocation.
pub struct App {
    pub config: CliConfig,
    pub reader: Arc<RpcChainReader>,
    pub storage: Storage,
    key: Option<SecretKey>,
    guards: InFlightGuards,
}

impl App {
    pub async fn new(config: CliConfig, private_key: Option<&str>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

        let key = private_key.map(parse_signing_key).transpose()?;
        let reader = Arc::new(RpcChainReader::new(&config.network)?);
        let storage = Storage::new(&config.db_path()).await?;

        Ok(Self {
            config,
            reader,
            storage,
            key,
            guards: InFlightGuards::new(),
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.config.network
    }

    /// Account of the configured signing key, if any.
    pub fn account(&self) -> Option<Address> {
        self.key.as_ref().map(key_address)
    }

    pub async fn session(&self) -> Result<Session> {
        let account = self.account().unwrap_or_default();
        Ok(Session::connect(self.reader.as_ref(), self.key, account).await?)
    }

    pub fn gateway(&self) -> Result<Arc<Web3Gateway>> {
        Ok(Arc::new(Web3Gateway::new(self.network())?))
    }

    pub fn submitter(&self) -> Result<PredictionSubmitter<RpcChainReader, Web3Gateway>> {
        Ok(
            PredictionSubmitter::new(self.reader.clone(), self.gateway()?, self.network())
                .with_guards(self.guards.clone()),
        )
    }

    pub fn reveal_engine(&self) -> Result<RevealEngine<RpcChainReader, Web3Gateway>> {
        Ok(
            RevealEngine::new(self.reader.clone(), self.gateway()?, self.network())
                .with_guards(self.guards.clone()),
        )
    }

    pub fn journal(&self) -> PredictionStore<'_> {
        PredictionStore::new(&self.storage, self.network().chain_id)
    }

    pub fn tx_line(&self, tx_hash: &blockcast_core::H256) -> String {
        match self.network().tx_url(tx_hash) {
            Some(url) => format!("{:?} ({})", tx_hash, url),
            None => format!("{:?}", tx_hash),
        }
    }
}
