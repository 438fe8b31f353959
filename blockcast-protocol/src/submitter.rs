use crate::error::{PredictionError, Result};
use crate::guard::{InFlightGuard, InFlightGuards};
use blockcast_core::types::HASH_TEXT_LEN;
use blockcast_core::{
    BlockcastError, ChainReader, ContractGateway, NetworkConfig, PredictionCommitment,
    PredictionEvent, PredictionKey, Session, H256, U256,
};
use std::sync::Arc;
use std::time::Duration;

/// A confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub tx_hash: H256,
    /// Commitment as recorded by the contract; the target comes from the
    /// `PredictionSubmitted` event when the receipt carries one.
    pub commitment: PredictionCommitment,
    pub block_number: Option<u64>,
}

/// Sends `submitPrediction` for the block after the current head.
pub struct PredictionSubmitter<R: ?Sized, G: ?Sized> {
    reader: Arc<R>,
    gateway: Arc<G>,
    guards: InFlightGuards,
    expected_chain_id: u64,
    confirmation_timeout: Duration,
}

impl<R, G> PredictionSubmitter<R, G>
where
    R: ChainReader + ?Sized,
    G: ContractGateway + ?Sized,
{
    pub fn new(reader: Arc<R>, gateway: Arc<G>, config: &NetworkConfig) -> Self {
        Self {
            reader,
            gateway,
            guards: InFlightGuards::new(),
            expected_chain_id: config.chain_id,
            confirmation_timeout: config.confirmation_timeout(),
        }
    }

    /// Share guards with a `RevealEngine` so the two never race on one key.
    pub fn with_guards(mut self, guards: InFlightGuards) -> Self {
        self.guards = guards;
        self
    }

    pub fn guards(&self) -> &InFlightGuards {
        &self.guards
    }

    /// Submit a textual prediction (`0x` + 64 hex characters).
    pub async fn submit(
        &self,
        session: &Session,
        predicted_hash: &str,
    ) -> Result<TransactionHandle<G>> {
        check_session(session, self.expected_chain_id)?;
        let predicted_hash = parse_prediction(predicted_hash)?;
        self.send(session, predicted_hash).await
    }

    /// Submit a prediction that is already a 32-byte value.
    pub async fn submit_hash(
        &self,
        session: &Session,
        predicted_hash: H256,
    ) -> Result<TransactionHandle<G>> {
        check_session(session, self.expected_chain_id)?;
        self.send(session, predicted_hash).await
    }

    async fn send(&self, session: &Session, predicted_hash: H256) -> Result<TransactionHandle<G>> {
        check_not_zero(&predicted_hash)?;

        let predictor = session.account();
        let head = self.reader.current_block().await?;
        let target_block = head.next_target();
        let guard = self
            .guards
            .try_acquire(PredictionKey::new(predictor, target_block))?;

        let existing = self
            .gateway
            .get_prediction(predictor, U256::from(target_block))
            .await?;
        if existing.exists() {
            tracing::warn!(
                "Prediction for block {} already committed by {:?}",
                target_block,
                predictor
            );
            return Err(PredictionError::SubmissionRejected(format!(
                "a prediction for block {} already exists",
                target_block
            )));
        }

        let tx_hash = self
            .gateway
            .submit_prediction(session, predicted_hash)
            .await
            .map_err(PredictionError::from_submit_failure)?;

        tracing::info!(
            "Submitted prediction {:?} for block {} in {:?}",
            predicted_hash,
            target_block,
            tx_hash
        );

        Ok(TransactionHandle {
            tx_hash,
            gateway: self.gateway.clone(),
            commitment: PredictionCommitment {
                predictor,
                target_block,
                predicted_hash,
            },
            timeout: self.confirmation_timeout,
            _guard: guard,
        })
    }
}

/// A sent `submitPrediction` transaction.
///
/// The in-flight guard for its key is held until the handle is dropped, so a
/// timed out `wait` can be retried without another submission slipping in.
/// Dropping the handle only abandons the local wait.
pub struct TransactionHandle<G: ?Sized> {
    tx_hash: H256,
    gateway: Arc<G>,
    commitment: PredictionCommitment,
    timeout: Duration,
    _guard: InFlightGuard,
}

impl<G: ContractGateway + ?Sized> TransactionHandle<G> {
    pub fn tx_hash(&self) -> H256 {
        self.tx_hash
    }

    /// Commitment as expected at send time.
    pub fn commitment(&self) -> &PredictionCommitment {
        &self.commitment
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn wait(&self) -> Result<SubmitOutcome> {
        let confirmation = self
            .gateway
            .wait_for_receipt(self.tx_hash, self.timeout)
            .await
            .map_err(|e| match e {
                BlockcastError::Timeout(msg) => {
                    tracing::warn!("{}", msg);
                    PredictionError::ConfirmationTimeout(self.tx_hash)
                }
                other => other.into(),
            })?;

        if !confirmation.success {
            tracing::warn!("Submission {:?} reverted", self.tx_hash);
            return Err(PredictionError::SubmissionRejected(format!(
                "transaction {:?} reverted",
                self.tx_hash
            )));
        }

        let mut commitment = self.commitment.clone();
        if let Some(PredictionEvent::Submitted {
            target_block,
            predicted_hash,
            ..
        }) = confirmation.submitted_event()
        {
            if *target_block != commitment.target_block {
                tracing::debug!(
                    "Prediction landed for block {} instead of {}",
                    target_block,
                    commitment.target_block
                );
            }
            commitment.target_block = *target_block;
            commitment.predicted_hash = *predicted_hash;
        }

        tracing::info!(
            "Prediction for block {} confirmed in block {:?}",
            commitment.target_block,
            confirmation.block_number
        );

        Ok(SubmitOutcome {
            tx_hash: self.tx_hash,
            commitment,
            block_number: confirmation.block_number,
        })
    }
}

pub(crate) fn check_session(session: &Session, expected_chain_id: u64) -> Result<()> {
    if !session.can_sign() {
        return Err(PredictionError::NoSigner);
    }
    if session.chain_id() != expected_chain_id {
        return Err(PredictionError::WrongChain {
            expected: expected_chain_id,
            actual: session.chain_id(),
        });
    }
    Ok(())
}

/// Accepts any `0x`-prefixed 32-byte hex value except zero.
pub fn parse_prediction(text: &str) -> Result<H256> {
    let text = text.trim();
    if text.len() != HASH_TEXT_LEN || !text.starts_with("0x") {
        return Err(PredictionError::InvalidPrediction(format!(
            "expected 0x followed by 64 hex characters, got {:?}",
            text
        )));
    }
    let hash = blockcast_core::types::parse_hash(text)
        .map_err(|e| PredictionError::InvalidPrediction(e.to_string()))?;
    check_not_zero(&hash)?;
    Ok(hash)
}

// getPrediction reports a zero predicted hash as "no commitment", so a zero
// commitment could never be revealed.
fn check_not_zero(hash: &H256) -> Result<()> {
    if hash.is_zero() {
        return Err(PredictionError::InvalidPrediction(
            "the zero hash cannot be committed".to_string(),
        ));
    }
    Ok(())
}
