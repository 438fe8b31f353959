use crate::error::{BlockcastError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use web3::types::{Address, H256};

/// Length of a textual hash: `0x` followed by 64 hex characters.
pub const HASH_TEXT_LEN: usize = 66;

/// A block as observed by one poll of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub number: u64,
    pub hash: H256,
    pub timestamp: u64,
}

impl BlockSnapshot {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.timestamp as i64, 0)
    }

    /// Block a prediction submitted now would target.
    pub fn next_target(&self) -> u64 {
        self.number + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionKey {
    pub predictor: Address,
    pub target_block: u64,
}

impl PredictionKey {
    pub fn new(predictor: Address, target_block: u64) -> Self {
        Self {
            predictor,
            target_block,
        }
    }
}

impl std::fmt::Display for PredictionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}@{}", self.predictor, self.target_block)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionCommitment {
    pub predictor: Address,
    pub target_block: u64,
    pub predicted_hash: H256,
}

impl PredictionCommitment {
    pub fn key(&self) -> PredictionKey {
        PredictionKey::new(self.predictor, self.target_block)
    }
}

/// On-chain state of one prediction, as returned by `getPrediction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted_hash: H256,
    pub actual_hash: H256,
    pub revealed: bool,
    pub is_correct: bool,
}

impl PredictionRecord {
    /// The contract returns an all-zero record for keys nobody committed to.
    pub fn exists(&self) -> bool {
        !self.predicted_hash.is_zero()
    }

    /// `None` until revealed; `is_correct` carries no meaning before that.
    pub fn outcome(&self) -> Option<bool> {
        self.revealed.then_some(self.is_correct)
    }
}

impl From<(H256, H256, bool, bool)> for PredictionRecord {
    fn from((predicted_hash, actual_hash, revealed, is_correct): (H256, H256, bool, bool)) -> Self {
        Self {
            predicted_hash,
            actual_hash,
            revealed,
            is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionEvent {
    Submitted {
        predictor: Address,
        target_block: u64,
        predicted_hash: H256,
        block_number: Option<u64>,
        tx_hash: Option<H256>,
    },
    Revealed {
        predictor: Address,
        target_block: u64,
        predicted_hash: H256,
        actual_hash: H256,
        is_correct: bool,
        block_number: Option<u64>,
        tx_hash: Option<H256>,
    },
}

impl PredictionEvent {
    pub fn predictor(&self) -> Address {
        match self {
            Self::Submitted { predictor, .. } | Self::Revealed { predictor, .. } => *predictor,
        }
    }

    pub fn target_block(&self) -> u64 {
        match self {
            Self::Submitted { target_block, .. } | Self::Revealed { target_block, .. } => {
                *target_block
            }
        }
    }

    pub fn key(&self) -> PredictionKey {
        PredictionKey::new(self.predictor(), self.target_block())
    }
}

/// Outcome of waiting for a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxConfirmation {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
    pub success: bool,
    pub events: Vec<PredictionEvent>,
}

impl TxConfirmation {
    pub fn submitted_event(&self) -> Option<&PredictionEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, PredictionEvent::Submitted { .. }))
    }

    pub fn revealed_event(&self) -> Option<&PredictionEvent> {
        self.events
            .iter()
            .find(|e| matches!(e, PredictionEvent::Revealed { .. }))
    }
}

/// Convert raw bytes into a 32-byte hash.
pub fn hash_from_slice(bytes: &[u8]) -> Result<H256> {
    if bytes.len() != 32 {
        return Err(BlockcastError::InvalidHashLength(bytes.len()));
    }
    Ok(H256::from_slice(bytes))
}

/// Parse `0x`-prefixed (or bare) hex into a 32-byte hash.
pub fn parse_hash(text: &str) -> Result<H256> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| BlockcastError::InvalidHex(format!("{}: {}", trimmed, e)))?;
    hash_from_slice(&bytes)
}

pub fn parse_address(text: &str) -> Result<Address> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)
        .map_err(|e| BlockcastError::InvalidAddress(format!("{}: {}", trimmed, e)))?;
    if bytes.len() != 20 {
        return Err(BlockcastError::InvalidAddress(format!(
            "{}: expected 20 bytes, got {}",
            trimmed,
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

pub fn format_hash(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

/// `0x` + first `chars` hex digits + `...` + last `chars` hex digits.
pub fn shorten_hash(hash: &str, chars: usize) -> String {
    if hash.is_empty() {
        return String::new();
    }
    if hash.len() <= 2 * chars + 2 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..chars + 2], &hash[hash.len() - chars..])
}

pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
