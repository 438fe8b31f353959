use crate::error::{PredictionError, Result};
use crate::guard::{InFlightGuard, InFlightGuards};
use crate::submitter::check_session;
use blockcast_core::{
    Address, BlockcastError, ChainReader, ContractGateway, NetworkConfig, PredictionKey,
    PredictionRecord, Session, H256, U256,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealOutcome {
    pub tx_hash: H256,
    pub target_block: u64,
    /// State read back from the contract after the reveal confirmed.
    pub record: PredictionRecord,
}

/// A sent reveal whose receipt did not arrive in time. Holds the key's guard.
struct PendingReveal {
    tx_hash: H256,
    current: u64,
    guard: InFlightGuard,
}

pub struct RevealEngine<R: ?Sized, G: ?Sized> {
    reader: Arc<R>,
    gateway: Arc<G>,
    guards: InFlightGuards,
    pending: Mutex<HashMap<PredictionKey, PendingReveal>>,
    expected_chain_id: u64,
    reveal_window: u64,
    confirmation_timeout: Duration,
}

impl<R, G> RevealEngine<R, G>
where
    R: ChainReader + ?Sized,
    G: ContractGateway + ?Sized,
{
    pub fn new(reader: Arc<R>, gateway: Arc<G>, config: &NetworkConfig) -> Self {
        Self {
            reader,
            gateway,
            guards: InFlightGuards::new(),
            pending: Mutex::new(HashMap::new()),
            expected_chain_id: config.chain_id,
            reveal_window: config.reveal_window,
            confirmation_timeout: config.confirmation_timeout(),
        }
    }

    pub fn with_guards(mut self, guards: InFlightGuards) -> Self {
        self.guards = guards;
        self
    }

    pub fn guards(&self) -> &InFlightGuards {
        &self.guards
    }

    /// Transaction of a reveal that timed out locally and is still unresolved.
    pub fn pending_reveal(&self, predictor: Address, target_block: u64) -> Option<H256> {
        self.pending
            .lock()
            .get(&PredictionKey::new(predictor, target_block))
            .map(|p| p.tx_hash)
    }

    /// Reveal the caller's prediction for `target_block` and return the
    /// record as the contract now stores it.
    pub async fn reveal(&self, session: &Session, target_block: u64) -> Result<PredictionRecord> {
        Ok(self.reveal_with_receipt(session, target_block).await?.record)
    }

    /// Like `reveal`, also returning the reveal transaction.
    ///
    /// After a `ConfirmationTimeout` the key stays locked and the next call
    /// for the same target resumes waiting on the transaction already sent
    /// instead of sending another one.
    pub async fn reveal_with_receipt(
        &self,
        session: &Session,
        target_block: u64,
    ) -> Result<RevealOutcome> {
        check_session(session, self.expected_chain_id)?;

        let predictor = session.account();
        let key = PredictionKey::new(predictor, target_block);

        let resumed = self.pending.lock().remove(&key);
        let (tx_hash, current, guard) = match resumed {
            Some(pending) => {
                tracing::debug!(
                    "Resuming reveal for block {} in {:?}",
                    target_block,
                    pending.tx_hash
                );
                (pending.tx_hash, pending.current, pending.guard)
            }
            None => {
                let guard = self.guards.try_acquire(key)?;
                let (tx_hash, current) = self.send(session, target_block).await?;
                (tx_hash, current, guard)
            }
        };

        let confirmation = match self
            .gateway
            .wait_for_receipt(tx_hash, self.confirmation_timeout)
            .await
        {
            Ok(confirmation) => confirmation,
            Err(BlockcastError::Timeout(msg)) => {
                tracing::warn!("{}", msg);
                self.pending.lock().insert(
                    key,
                    PendingReveal {
                        tx_hash,
                        current,
                        guard,
                    },
                );
                return Err(PredictionError::ConfirmationTimeout(tx_hash));
            }
            Err(other) => {
                return Err(PredictionError::from_reveal_failure(
                    other,
                    target_block,
                    current,
                ))
            }
        };

        if !confirmation.success {
            return Err(self.classify_reverted(predictor, target_block).await);
        }

        let record = self
            .gateway
            .get_prediction(predictor, U256::from(target_block))
            .await?;
        if !record.revealed {
            return Err(PredictionError::ContractCallFailed {
                reason: format!(
                    "reveal {:?} confirmed but block {} is still unrevealed",
                    tx_hash, target_block
                ),
            });
        }

        tracing::info!(
            "Revealed prediction for block {}: {}",
            target_block,
            if record.is_correct {
                "correct"
            } else {
                "incorrect"
            }
        );

        Ok(RevealOutcome {
            tx_hash,
            target_block,
            record,
        })
    }

    /// Checks and pre-read, then `revealPrediction`. Returns the transaction
    /// and the height it was checked against.
    async fn send(&self, session: &Session, target_block: u64) -> Result<(H256, u64)> {
        let predictor = session.account();
        let current = self.reader.current_block().await?.number;
        self.check_window(target_block, current)?;

        let existing = self
            .gateway
            .get_prediction(predictor, U256::from(target_block))
            .await?;
        if !existing.exists() {
            return Err(PredictionError::PredictionNotFound { target_block });
        }
        if existing.revealed {
            return Err(PredictionError::AlreadyRevealed { target_block });
        }

        let tx_hash = self
            .gateway
            .reveal_prediction(session, U256::from(target_block))
            .await
            .map_err(|e| PredictionError::from_reveal_failure(e, target_block, current))?;

        tracing::debug!("Reveal for block {} sent in {:?}", target_block, tx_hash);
        Ok((tx_hash, current))
    }

    fn check_window(&self, target_block: u64, current: u64) -> Result<()> {
        if target_block > current {
            return Err(PredictionError::TargetNotMined {
                target_block,
                current,
            });
        }
        if current - target_block > self.reveal_window {
            tracing::warn!(
                "Block {} is {} blocks old, past the reveal window",
                target_block,
                current - target_block
            );
            return Err(PredictionError::RevealWindowExpired {
                target_block,
                current,
            });
        }
        Ok(())
    }

    /// Work out why a mined reveal transaction reverted.
    async fn classify_reverted(&self, predictor: Address, target_block: u64) -> PredictionError {
        let record = self
            .gateway
            .get_prediction(predictor, U256::from(target_block))
            .await;
        let current = self.reader.current_block().await.map(|s| s.number);

        match (record, current) {
            (Ok(record), _) if record.revealed => {
                PredictionError::AlreadyRevealed { target_block }
            }
            (_, Ok(current)) if current.saturating_sub(target_block) > self.reveal_window => {
                PredictionError::RevealWindowExpired {
                    target_block,
                    current,
                }
            }
            _ => PredictionError::ContractCallFailed {
                reason: format!("reveal for block {} reverted", target_block),
            },
        }
    }
}
