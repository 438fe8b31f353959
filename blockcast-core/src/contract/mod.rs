pub mod abi;
pub mod events;

pub use abi::{PredictionAbi, PREDICTOR_ABI};
pub use events::{EventSubscription, EventWatcher};

use crate::chain::http_transport;
use crate::error::{BlockcastError, Result};
use crate::network::{NetworkConfig, Session};
use crate::types::{PredictionEvent, PredictionRecord, TxConfirmation};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use web3::contract::tokens::Tokenize;
use web3::contract::{Contract, Options};
use web3::transports::Http;
use web3::types::{
    Address, BlockId, BlockNumber, FilterBuilder, TransactionReceipt, H256, U256, U64,
};
use web3::Web3;

/// Typed binding of the `BlockHashPredictor` contract.
///
/// One method per ABI entry plus receipt and log access. Every failure of a
/// contract interaction surfaces as `BlockcastError::ContractCallFailed`
/// carrying the node's revert reason when one is available.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// `submitPrediction(bytes32)`; returns the transaction hash.
    async fn submit_prediction(&self, session: &Session, predicted_hash: H256) -> Result<H256>;

    /// `revealPrediction(uint256)`; returns the transaction hash.
    async fn reveal_prediction(&self, session: &Session, target_block: U256) -> Result<H256>;

    /// `getPrediction(address,uint256)`.
    async fn get_prediction(
        &self,
        predictor: Address,
        target_block: U256,
    ) -> Result<PredictionRecord>;

    /// Wait for the receipt of `tx_hash`, decoding prediction events from it.
    async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration) -> Result<TxConfirmation>;

    /// Prediction events emitted in `from_block..=to_block`.
    async fn prediction_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PredictionEvent>>;
}

pub struct Web3Gateway {
    web3: Web3<Http>,
    contract: Contract<Http>,
    abi: PredictionAbi,
    receipt_poll_interval: Duration,
    gas_limit: Option<u64>,
}

impl Web3Gateway {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let address = config.contract_address()?;
        let web3 = Web3::new(http_transport(config)?);
        let contract = Contract::from_json(web3.eth(), address, PREDICTOR_ABI.as_bytes())
            .map_err(|e| BlockcastError::internal(format!("Invalid contract ABI: {}", e)))?;

        Ok(Self {
            web3,
            contract,
            abi: PredictionAbi::load()?,
            receipt_poll_interval: config.receipt_poll_interval(),
            gas_limit: config.gas_limit,
        })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    async fn send<P>(&self, session: &Session, func: &str, params: P) -> Result<H256>
    where
        P: Tokenize + Clone + Send,
    {
        let key = session
            .signer()
            .ok_or_else(|| BlockcastError::contract("Session has no signing key"))?;

        // eth_estimateGas reports the revert reason, eth_sendRawTransaction does not
        let estimate = self
            .contract
            .estimate_gas(func, params.clone(), session.account(), Options::default())
            .await
            .map_err(|e| {
                let reason = revert_reason(&e.to_string());
                tracing::warn!("{} would revert: {}", func, reason);
                BlockcastError::contract(reason)
            })?;

        let gas = match self.gas_limit {
            Some(limit) => U256::from(limit),
            None => estimate + estimate / 5,
        };
        let options = Options {
            gas: Some(gas),
            ..Default::default()
        };

        let tx_hash = self
            .contract
            .signed_call(func, params, options, key)
            .await
            .map_err(|e| BlockcastError::contract(revert_reason(&e.to_string())))?;

        tracing::debug!("{} sent in {:?} (gas {})", func, tx_hash, gas);
        Ok(tx_hash)
    }

    async fn poll_receipt(&self, tx_hash: H256, timeout: Duration) -> Result<TransactionReceipt> {
        let deadline = Instant::now() + timeout;
        let mut last_error = None;

        loop {
            match self.web3.eth().transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => last_error = None,
                Err(e) => {
                    tracing::warn!("Receipt poll for {:?} failed: {}", tx_hash, e);
                    last_error = Some(e.to_string());
                }
            }

            if Instant::now() >= deadline {
                return Err(receipt_timeout(tx_hash, timeout, last_error));
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }
}

#[async_trait]
impl ContractGateway for Web3Gateway {
    async fn submit_prediction(&self, session: &Session, predicted_hash: H256) -> Result<H256> {
        self.send(session, "submitPrediction", predicted_hash).await
    }

    async fn reveal_prediction(&self, session: &Session, target_block: U256) -> Result<H256> {
        self.send(session, "revealPrediction", target_block).await
    }

    async fn get_prediction(
        &self,
        predictor: Address,
        target_block: U256,
    ) -> Result<PredictionRecord> {
        let raw: (H256, H256, bool, bool) = self
            .contract
            .query(
                "getPrediction",
                (predictor, target_block),
                predictor,
                Options::default(),
                BlockId::Number(BlockNumber::Latest),
            )
            .await
            .map_err(|e| BlockcastError::contract(revert_reason(&e.to_string())))?;

        Ok(PredictionRecord::from(raw))
    }

    async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration) -> Result<TxConfirmation> {
        let receipt = self.poll_receipt(tx_hash, timeout).await?;

        let mut events = Vec::new();
        for log in receipt.logs.iter().filter(|l| l.address == self.address()) {
            if let Some(event) = self.abi.decode_log(log)? {
                events.push(event);
            }
        }

        Ok(TxConfirmation {
            tx_hash,
            block_number: receipt.block_number.map(|n| n.as_u64()),
            // pre-byzantium receipts carry no status
            success: receipt.status.map_or(true, |s| s == U64::from(1)),
            events,
        })
    }

    async fn prediction_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PredictionEvent>> {
        let filter = FilterBuilder::default()
            .address(vec![self.address()])
            .topics(
                Some(vec![
                    self.abi.submitted_topic()?,
                    self.abi.revealed_topic()?,
                ]),
                None,
                None,
                None,
            )
            .from_block(BlockNumber::Number(U64::from(from_block)))
            .to_block(BlockNumber::Number(U64::from(to_block)))
            .build();

        let logs = self.web3.eth().logs(filter).await.map_err(|e| {
            BlockcastError::unavailable(format!(
                "Failed to get logs {}..={}: {}",
                from_block, to_block, e
            ))
        })?;

        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(event) = self.abi.decode_log(log)? {
                events.push(event);
            }
        }
        Ok(events)
    }
}

/// The transaction may still confirm, so this stays a `Timeout`; a failing
/// node is named in the message.
fn receipt_timeout(tx_hash: H256, timeout: Duration, last_error: Option<String>) -> BlockcastError {
    let mut msg = format!("No receipt for {:?} after {}s", tx_hash, timeout.as_secs());
    if let Some(err) = last_error {
        msg.push_str(&format!("; last RPC error: {}", err));
    }
    BlockcastError::timeout(msg)
}

/// Pull the revert reason out of a node error message, falling back to the
/// whole message.
pub fn revert_reason(message: &str) -> String {
    const MARKER: &str = "execution reverted";

    let Some(start) = message.find(MARKER) else {
        return message.to_string();
    };

    let rest = message[start + MARKER.len()..]
        .trim_start_matches(':')
        .trim_start();
    let end = rest.find(['"', '\\']).unwrap_or(rest.len());
    let reason = rest[..end].trim();

    if reason.is_empty() {
        MARKER.to_string()
    } else {
        reason.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revert_reason_from_rpc_error() {
        let message = r#"Api error: RPC error: Error { code: ServerError(3), message: "execution reverted: Prediction already exists", data: Some(String("0x08c3")) }"#;
        assert_eq!(revert_reason(message), "Prediction already exists");
    }

    #[test]
    fn test_revert_reason_without_text() {
        assert_eq!(
            revert_reason("RPC error: execution reverted"),
            "execution reverted"
        );
        assert_eq!(
            revert_reason("error sending request for url"),
            "error sending request for url"
        );
    }

    #[test]
    fn test_gateway_requires_contract_address() {
        let config = NetworkConfig::local(31337);
        assert!(matches!(
            Web3Gateway::new(&config),
            Err(BlockcastError::Config(_))
        ));
    }

    #[test]
    fn test_gateway_binds_configured_address() {
        let config = NetworkConfig::local(31337).with_contract(Address::repeat_byte(0x42));
        let gateway = Web3Gateway::new(&config).unwrap();
        assert_eq!(gateway.address(), Address::repeat_byte(0x42));
    }

    #[test]
    fn test_receipt_timeout_names_last_rpc_error() {
        let timeout = Duration::from_secs(120);
        match receipt_timeout(H256::zero(), timeout, None) {
            BlockcastError::Timeout(msg) => assert!(!msg.contains("RPC error")),
            other => panic!("unexpected error {:?}", other),
        }
        match receipt_timeout(H256::zero(), timeout, Some("connection refused".into())) {
            BlockcastError::Timeout(msg) => {
                assert!(msg.contains("last RPC error: connection refused"))
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_is_reported_in_receipt_timeout() {
        let mut config = NetworkConfig::local(31337).with_contract(Address::repeat_byte(0x42));
        // nothing listens on port 1
        config.rpc_url = "http://127.0.0.1:1".to_string();
        config.receipt_poll_interval_ms = 10;
        let gateway = Web3Gateway::new(&config).unwrap();

        let err = gateway
            .wait_for_receipt(H256::repeat_byte(0x11), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(
            matches!(&err, BlockcastError::Timeout(msg) if msg.contains("last RPC error")),
            "unexpected error {:?}",
            err
        );
    }
}
