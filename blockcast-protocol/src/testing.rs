//! In-memory chain and `BlockHashPredictor` double for protocol tests.

use async_trait::async_trait;
use blockcast_core::network::parse_signing_key;
use blockcast_core::{
    Address, BlockSnapshot, BlockcastError, ChainReader, ContractGateway, PredictionEvent,
    PredictionRecord, Result, Session, TxConfirmation, H256, U256,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

pub const CHAIN_ID: u64 = 31337;
pub const REVEAL_WINDOW: u64 = 256;

pub fn signer_session() -> Session {
    let key = parse_signing_key("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
        .unwrap();
    Session::with_signer(key, CHAIN_ID)
}

/// Default hash of block `number` unless overridden with `set_block_hash`.
pub fn block_hash(number: u64) -> H256 {
    let mut bytes = [0x5a; 32];
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    H256(bytes)
}

#[derive(Default)]
struct State {
    height: u64,
    hashes: HashMap<u64, H256>,
    records: HashMap<(Address, u64), PredictionRecord>,
    receipts: HashMap<H256, TxConfirmation>,
    log: Vec<PredictionEvent>,
    tx_counter: u64,
    submit_calls: u32,
    reveal_calls: u32,
    offline: bool,
    withhold_receipts: bool,
    inclusion_delay: u64,
    ignore_reveals: bool,
}

/// Follows the contract's rules: one commitment per (predictor, target),
/// target is the block after the one the submit lands in, a single reveal
/// once the target is mined and at most `REVEAL_WINDOW` blocks old.
/// Transactions land in the current head unless an inclusion delay is set.
pub struct MockChain {
    chain_id: u64,
    state: Mutex<State>,
}

impl MockChain {
    pub fn new(height: u64) -> Self {
        Self {
            chain_id: CHAIN_ID,
            state: Mutex::new(State {
                height,
                ..Default::default()
            }),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn mine(&self, blocks: u64) {
        self.state.lock().height += blocks;
    }

    pub fn set_block_hash(&self, number: u64, hash: H256) {
        self.state.lock().hashes.insert(number, hash);
    }

    pub fn height(&self) -> u64 {
        self.state.lock().height
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    pub fn withhold_receipts(&self, withhold: bool) {
        self.state.lock().withhold_receipts = withhold;
    }

    /// Blocks mined between sending a submit and its inclusion.
    pub fn set_inclusion_delay(&self, blocks: u64) {
        self.state.lock().inclusion_delay = blocks;
    }

    /// Accept reveal transactions without changing any record.
    pub fn ignore_reveals(&self) {
        self.state.lock().ignore_reveals = true;
    }

    pub fn submit_calls(&self) -> u32 {
        self.state.lock().submit_calls
    }

    pub fn reveal_calls(&self) -> u32 {
        self.state.lock().reveal_calls
    }

    pub fn record(&self, predictor: Address, target_block: u64) -> PredictionRecord {
        self.state
            .lock()
            .records
            .get(&(predictor, target_block))
            .copied()
            .unwrap_or_default()
    }

    fn hash_of(state: &State, number: u64) -> H256 {
        state
            .hashes
            .get(&number)
            .copied()
            .unwrap_or_else(|| block_hash(number))
    }

    fn next_tx(state: &mut State) -> H256 {
        state.tx_counter += 1;
        H256::from_low_u64_be(0xf000_0000 + state.tx_counter)
    }

    fn check_online(state: &State) -> Result<()> {
        if state.offline {
            return Err(BlockcastError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn current_block(&self) -> Result<BlockSnapshot> {
        let height = {
            let state = self.state.lock();
            Self::check_online(&state)?;
            state.height
        };
        self.block_by_number(height).await
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSnapshot> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        if number > state.height {
            return Err(BlockcastError::unavailable(format!(
                "No block returned for height {}",
                number
            )));
        }
        Ok(BlockSnapshot {
            number,
            hash: Self::hash_of(&state, number),
            timestamp: 1_700_000_000 + number,
        })
    }

    async fn chain_id(&self) -> Result<u64> {
        Self::check_online(&self.state.lock())?;
        Ok(self.chain_id)
    }
}

#[async_trait]
impl ContractGateway for MockChain {
    async fn submit_prediction(&self, session: &Session, predicted_hash: H256) -> Result<H256> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        state.submit_calls += 1;

        let included_in = state.height + state.inclusion_delay;
        let target_block = included_in + 1;
        let key = (session.account(), target_block);

        if state.records.get(&key).is_some_and(|r| r.exists()) {
            return Err(BlockcastError::contract("Prediction already exists"));
        }

        state.height = included_in;
        state.records.insert(
            key,
            PredictionRecord {
                predicted_hash,
                ..Default::default()
            },
        );

        let tx_hash = Self::next_tx(&mut state);
        let event = PredictionEvent::Submitted {
            predictor: session.account(),
            target_block,
            predicted_hash,
            block_number: Some(included_in),
            tx_hash: Some(tx_hash),
        };
        state.log.push(event.clone());
        state.receipts.insert(
            tx_hash,
            TxConfirmation {
                tx_hash,
                block_number: Some(included_in),
                success: true,
                events: vec![event],
            },
        );

        Ok(tx_hash)
    }

    async fn reveal_prediction(&self, session: &Session, target_block: U256) -> Result<H256> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        state.reveal_calls += 1;

        let target_block = target_block.as_u64();
        let key = (session.account(), target_block);
        let height = state.height;

        if target_block > height {
            return Err(BlockcastError::contract("Target block not mined yet"));
        }
        if height - target_block > REVEAL_WINDOW {
            return Err(BlockcastError::contract("Reveal window expired"));
        }
        let record = match state.records.get(&key) {
            Some(record) if record.exists() => *record,
            _ => return Err(BlockcastError::contract("No prediction found")),
        };
        if record.revealed {
            return Err(BlockcastError::contract("Already revealed"));
        }

        let tx_hash = Self::next_tx(&mut state);
        let mut events = Vec::new();

        if !state.ignore_reveals {
            let actual_hash = Self::hash_of(&state, target_block);
            let revealed = PredictionRecord {
                predicted_hash: record.predicted_hash,
                actual_hash,
                revealed: true,
                is_correct: record.predicted_hash == actual_hash,
            };
            state.records.insert(key, revealed);

            let event = PredictionEvent::Revealed {
                predictor: session.account(),
                target_block,
                predicted_hash: record.predicted_hash,
                actual_hash,
                is_correct: revealed.is_correct,
                block_number: Some(height),
                tx_hash: Some(tx_hash),
            };
            state.log.push(event.clone());
            events.push(event);
        }

        state.receipts.insert(
            tx_hash,
            TxConfirmation {
                tx_hash,
                block_number: Some(height),
                success: true,
                events,
            },
        );

        Ok(tx_hash)
    }

    async fn get_prediction(
        &self,
        predictor: Address,
        target_block: U256,
    ) -> Result<PredictionRecord> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state
            .records
            .get(&(predictor, target_block.as_u64()))
            .copied()
            .unwrap_or_default())
    }

    async fn wait_for_receipt(&self, tx_hash: H256, timeout: Duration) -> Result<TxConfirmation> {
        let state = self.state.lock();
        if state.withhold_receipts {
            return Err(BlockcastError::timeout(format!(
                "No receipt for {:?} after {}s",
                tx_hash,
                timeout.as_secs()
            )));
        }
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or_else(|| BlockcastError::contract(format!("Unknown transaction {:?}", tx_hash)))
    }

    async fn prediction_events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<PredictionEvent>> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state
            .log
            .iter()
            .filter(|event| {
                let block = match event {
                    PredictionEvent::Submitted { block_number, .. }
                    | PredictionEvent::Revealed { block_number, .. } => block_number.unwrap_or(0),
                };
                (from_block..=to_block).contains(&block)
            })
            .cloned()
            .collect())
    }
}
