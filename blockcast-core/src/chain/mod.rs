pub mod poller;

pub use poller::{BlockPoller, PollerHandle};

use crate::error::{BlockcastError, Result};
use crate::network::NetworkConfig;
use crate::types::BlockSnapshot;
use async_trait::async_trait;
use web3::transports::Http;
use web3::types::{Block, BlockId, BlockNumber, H256, U64};
use web3::Web3;

/// Read-only view of chain height, block hashes and timestamps.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn current_block(&self) -> Result<BlockSnapshot>;

    async fn block_by_number(&self, number: u64) -> Result<BlockSnapshot>;

    async fn chain_id(&self) -> Result<u64>;
}

/// `ChainReader` backed by a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    web3: Web3<Http>,
    endpoint: String,
}

impl RpcChainReader {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let web3 = Web3::new(http_transport(config)?);
        Ok(Self {
            web3,
            endpoint: config.rpc_url.clone(),
        })
    }

    pub fn web3(&self) -> &Web3<Http> {
        &self.web3
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn current_block(&self) -> Result<BlockSnapshot> {
        let number = self.web3.eth().block_number().await.map_err(|e| {
            BlockcastError::unavailable(format!(
                "Failed to get block number from {}: {}",
                self.endpoint, e
            ))
        })?;

        self.block_by_number(number.as_u64()).await
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSnapshot> {
        let id = BlockId::Number(BlockNumber::Number(U64::from(number)));
        let block = self
            .web3
            .eth()
            .block(id)
            .await
            .map_err(|e| {
                BlockcastError::unavailable(format!("Failed to get block {}: {}", number, e))
            })?
            .ok_or_else(|| {
                BlockcastError::unavailable(format!("No block returned for height {}", number))
            })?;

        snapshot_from_block(number, &block)
    }

    async fn chain_id(&self) -> Result<u64> {
        let id = self.web3.eth().chain_id().await.map_err(|e| {
            BlockcastError::unavailable(format!(
                "Failed to get chain id from {}: {}",
                self.endpoint, e
            ))
        })?;
        Ok(id.low_u64())
    }
}

/// HTTP transport with the configured request timeout.
pub fn http_transport(config: &NetworkConfig) -> Result<Http> {
    let client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| BlockcastError::config(format!("Failed to build HTTP client: {}", e)))?;
    let url = reqwest::Url::parse(&config.rpc_url)
        .map_err(|e| BlockcastError::config(format!("Invalid RPC URL {}: {}", config.rpc_url, e)))?;
    Ok(Http::with_client(client, url))
}

fn snapshot_from_block(requested: u64, block: &Block<H256>) -> Result<BlockSnapshot> {
    // pending blocks come back without a hash
    let hash = block.hash.ok_or_else(|| {
        BlockcastError::unavailable(format!("Block {} has no hash yet", requested))
    })?;
    let number = block.number.map(|n| n.as_u64()).unwrap_or(requested);

    Ok(BlockSnapshot {
        number,
        hash,
        timestamp: block.timestamp.low_u64(),
    })
}
