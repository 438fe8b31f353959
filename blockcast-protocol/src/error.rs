use blockcast_core::{BlockcastError, PredictionKey, H256};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PredictionError>;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Chain unavailable: {0}")]
    UnavailableChain(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("No signing key available for this session")]
    NoSigner,

    #[error("Wrong chain: expected chain id {expected}, connected to {actual}")]
    WrongChain { expected: u64, actual: u64 },

    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    #[error("Prediction for block {target_block} is already revealed")]
    AlreadyRevealed { target_block: u64 },

    #[error("Reveal window expired for block {target_block} (current block {current})")]
    RevealWindowExpired { target_block: u64, current: u64 },

    #[error("Block {target_block} is not mined yet (current block {current})")]
    TargetNotMined { target_block: u64, current: u64 },

    #[error("No prediction found for block {target_block}")]
    PredictionNotFound { target_block: u64 },

    #[error("Another operation is in flight for {0}")]
    OperationInFlight(PredictionKey),

    #[error("Timed out waiting for confirmation of {0:?}")]
    ConfirmationTimeout(H256),

    #[error("Contract call failed: {reason}")]
    ContractCallFailed { reason: String },

    #[error("Blockcast core error: {0}")]
    Core(BlockcastError),
}

impl From<BlockcastError> for PredictionError {
    fn from(err: BlockcastError) -> Self {
        match err {
            BlockcastError::UnavailableChain(msg) => Self::UnavailableChain(msg),
            BlockcastError::InvalidHashLength(len) => Self::InvalidHashLength(len),
            BlockcastError::ContractCallFailed { reason } => Self::ContractCallFailed { reason },
            other => Self::Core(other),
        }
    }
}

impl PredictionError {
    /// Classify a failed `submitPrediction` by its revert reason.
    pub(crate) fn from_submit_failure(err: BlockcastError) -> Self {
        match err {
            BlockcastError::ContractCallFailed { reason } if is_duplicate(&reason) => {
                Self::SubmissionRejected(reason)
            }
            other => other.into(),
        }
    }

    /// Classify a failed `revealPrediction` by its revert reason.
    pub(crate) fn from_reveal_failure(err: BlockcastError, target_block: u64, current: u64) -> Self {
        match err {
            BlockcastError::ContractCallFailed { reason } => {
                let lower = reason.to_lowercase();
                if lower.contains("already") {
                    Self::AlreadyRevealed { target_block }
                } else if lower.contains("expired")
                    || lower.contains("too old")
                    || lower.contains("window")
                {
                    Self::RevealWindowExpired {
                        target_block,
                        current,
                    }
                } else if lower.contains("not found") || lower.contains("no prediction") {
                    Self::PredictionNotFound { target_block }
                } else {
                    Self::ContractCallFailed { reason }
                }
            }
            other => other.into(),
        }
    }
}

fn is_duplicate(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    lower.contains("already") || lower.contains("exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_protocol_variants() {
        assert!(matches!(
            PredictionError::from(BlockcastError::unavailable("down")),
            PredictionError::UnavailableChain(_)
        ));
        assert!(matches!(
            PredictionError::from(BlockcastError::InvalidHashLength(31)),
            PredictionError::InvalidHashLength(31)
        ));
        assert!(matches!(
            PredictionError::from(BlockcastError::config("bad")),
            PredictionError::Core(BlockcastError::Config(_))
        ));
    }

    #[test]
    fn test_submit_revert_classification() {
        assert!(matches!(
            PredictionError::from_submit_failure(BlockcastError::contract(
                "Prediction already exists"
            )),
            PredictionError::SubmissionRejected(_)
        ));
        assert!(matches!(
            PredictionError::from_submit_failure(BlockcastError::contract("out of gas")),
            PredictionError::ContractCallFailed { .. }
        ));
    }

    #[test]
    fn test_reveal_revert_classification() {
        let classify =
            |reason: &str| PredictionError::from_reveal_failure(BlockcastError::contract(reason), 10, 300);

        assert!(matches!(
            classify("Already revealed"),
            PredictionError::AlreadyRevealed { target_block: 10 }
        ));
        assert!(matches!(
            classify("Reveal window expired"),
            PredictionError::RevealWindowExpired {
                target_block: 10,
                current: 300
            }
        ));
        assert!(matches!(
            classify("No prediction for this block"),
            PredictionError::PredictionNotFound { target_block: 10 }
        ));
        assert!(matches!(
            classify("insufficient funds for gas"),
            PredictionError::ContractCallFailed { .. }
        ));
    }
}
