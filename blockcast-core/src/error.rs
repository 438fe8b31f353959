use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockcastError>;

#[derive(Error, Debug)]
pub enum BlockcastError {
    #[error("Chain unavailable: {0}")]
    UnavailableChain(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("Invalid hex value: {0}")]
    InvalidHex(String),

    #[error("Contract call failed: {reason}")]
    ContractCallFailed { reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BlockcastError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::UnavailableChain(msg.into())
    }

    pub fn contract(reason: impl Into<String>) -> Self {
        Self::ContractCallFailed {
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
