//! Commit-reveal protocol for block hash predictions
//!
//! Candidates are derived from the latest block hash, one of them (or any
//! custom 32-byte value) is committed for the next block, and once that block
//! is mined the commitment is revealed and checked by the contract.

pub mod candidates;
pub mod error;
pub mod guard;
pub mod reveal;
pub mod submitter;

#[cfg(test)]
pub(crate) mod testing;

pub use candidates::{generate, CandidateSet, CANDIDATE_COUNT};
pub use error::{PredictionError, Result};
pub use guard::{InFlightGuard, InFlightGuards};
pub use reveal::{RevealEngine, RevealOutcome};
pub use submitter::{parse_prediction, PredictionSubmitter, SubmitOutcome, TransactionHandle};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{signer_session, MockChain, CHAIN_ID};
    use blockcast_core::types::format_hash;
    use blockcast_core::{ChainReader, NetworkConfig, H256};
    use std::sync::Arc;

    async fn predict_block_100(
        actual: impl Fn(&CandidateSet) -> H256,
    ) -> (CandidateSet, H256, bool) {
        let chain = Arc::new(MockChain::new(99));
        chain.set_block_hash(99, H256::repeat_byte(0xaa));

        let config = NetworkConfig::local(CHAIN_ID);
        let guards = InFlightGuards::new();
        let submitter = PredictionSubmitter::new(chain.clone(), chain.clone(), &config)
            .with_guards(guards.clone());
        let engine = RevealEngine::new(chain.clone(), chain.clone(), &config).with_guards(guards);
        let session = signer_session();

        let head = chain.current_block().await.unwrap();
        let set = candidates::for_snapshot(&head);
        assert_eq!(set, generate(&[0xaa; 32], 100u64).unwrap());

        let outcome = submitter
            .submit(&session, &format_hash(&set[2]))
            .await
            .unwrap()
            .wait()
            .await
            .unwrap();
        assert_eq!(outcome.commitment.target_block, 100);
        assert_eq!(outcome.commitment.predicted_hash, set[2]);

        let actual_hash = actual(&set);
        chain.mine(1);
        chain.set_block_hash(100, actual_hash);

        let record = engine.reveal(&session, 100).await.unwrap();
        assert!(record.revealed);
        assert_eq!(record.predicted_hash, set[2]);
        assert_eq!(record.actual_hash, actual_hash);
        (set, actual_hash, record.is_correct)
    }

    #[tokio::test]
    async fn test_end_to_end_miss() {
        let (set, actual, is_correct) = predict_block_100(|_| H256::repeat_byte(0xbb)).await;
        assert_eq!(is_correct, set[2] == actual);
        assert!(!is_correct);
    }

    #[tokio::test]
    async fn test_end_to_end_hit() {
        let (_, _, is_correct) = predict_block_100(|set| set[2]).await;
        assert!(is_correct);
    }
}
