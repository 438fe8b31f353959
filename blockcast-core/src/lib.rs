//! Blockcast SDK - Core library for block hash predictions on EVM chains
//!
//! This library provides chain reads, the typed binding of the
//! `BlockHashPredictor` commit-reveal contract, event decoding and a local
//! journal of submitted predictions.

pub mod chain;
pub mod contract;
pub mod error;
pub mod network;
pub mod storage;
pub mod types;

pub use chain::{BlockPoller, ChainReader, PollerHandle, RpcChainReader};
pub use contract::{ContractGateway, EventSubscription, EventWatcher, Web3Gateway};
pub use error::{BlockcastError, Result};
pub use network::{NetworkConfig, Session};
pub use storage::{PredictionStore, Storage};
pub use types::{
    BlockSnapshot, PredictionCommitment, PredictionEvent, PredictionKey, PredictionRecord,
    TxConfirmation,
};

pub use web3::signing::SecretKey;
pub use web3::types::{Address, H256, U256};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_storage_creation() {
        let temp_dir = tempdir().unwrap();
        let storage = Storage::new(&temp_dir.path().join("nested").join("blockcast.db"))
            .await
            .unwrap();

        let store = PredictionStore::new(&storage, 8119);
        assert!(store
            .list_all(&Address::repeat_byte(1))
            .await
            .unwrap()
            .is_empty());
    }
}
