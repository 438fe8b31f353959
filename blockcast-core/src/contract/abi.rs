//! `BlockHashPredictor` ABI and log decoding.

use crate::error::{BlockcastError, Result};
use crate::types::{hash_from_slice, PredictionEvent};
use web3::ethabi::{self, RawLog, Token};
use web3::types::{Log, H256, U256};

pub const SUBMITTED_EVENT: &str = "PredictionSubmitted";
pub const REVEALED_EVENT: &str = "PredictionRevealed";

pub const PREDICTOR_ABI: &str = r#"[
  {
    "anonymous": false,
    "inputs": [
      { "indexed": true, "name": "predictor", "type": "address" },
      { "indexed": false, "name": "targetBlock", "type": "uint256" },
      { "indexed": false, "name": "predictedHash", "type": "bytes32" }
    ],
    "name": "PredictionSubmitted",
    "type": "event"
  },
  {
    "anonymous": false,
    "inputs": [
      { "indexed": true, "name": "predictor", "type": "address" },
      { "indexed": false, "name": "targetBlock", "type": "uint256" },
      { "indexed": false, "name": "predictedHash", "type": "bytes32" },
      { "indexed": false, "name": "actualHash", "type": "bytes32" },
      { "indexed": false, "name": "isCorrect", "type": "bool" }
    ],
    "name": "PredictionRevealed",
    "type": "event"
  },
  {
    "inputs": [{ "name": "_predictedHash", "type": "bytes32" }],
    "name": "submitPrediction",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  },
  {
    "inputs": [{ "name": "_targetBlock", "type": "uint256" }],
    "name": "revealPrediction",
    "outputs": [],
    "stateMutability": "nonpayable",
    "type": "function"
  },
  {
    "inputs": [
      { "name": "_predictor", "type": "address" },
      { "name": "_targetBlock", "type": "uint256" }
    ],
    "name": "getPrediction",
    "outputs": [
      { "name": "predictedHash", "type": "bytes32" },
      { "name": "actualHash", "type": "bytes32" },
      { "name": "revealed", "type": "bool" },
      { "name": "isCorrect", "type": "bool" }
    ],
    "stateMutability": "view",
    "type": "function"
  }
]"#;

#[derive(Debug, Clone)]
pub struct PredictionAbi {
    contract: ethabi::Contract,
}

impl PredictionAbi {
    pub fn load() -> Result<Self> {
        let contract = ethabi::Contract::load(PREDICTOR_ABI.as_bytes())
            .map_err(|e| BlockcastError::internal(format!("Invalid contract ABI: {}", e)))?;
        Ok(Self { contract })
    }

    pub fn contract(&self) -> &ethabi::Contract {
        &self.contract
    }

    pub fn submitted_topic(&self) -> Result<H256> {
        Ok(self.event(SUBMITTED_EVENT)?.signature())
    }

    pub fn revealed_topic(&self) -> Result<H256> {
        Ok(self.event(REVEALED_EVENT)?.signature())
    }

    fn event(&self, name: &str) -> Result<&ethabi::Event> {
        self.contract
            .event(name)
            .map_err(|e| BlockcastError::internal(format!("Missing event {}: {}", name, e)))
    }

    /// Decode a log emitted by the predictor contract. Logs of other events
    /// decode to `None`.
    pub fn decode_log(&self, log: &Log) -> Result<Option<PredictionEvent>> {
        self.decode_raw(
            log.topics.clone(),
            log.data.0.clone(),
            log.block_number.map(|n| n.as_u64()),
            log.transaction_hash,
        )
    }

    pub fn decode_raw(
        &self,
        topics: Vec<H256>,
        data: Vec<u8>,
        block_number: Option<u64>,
        tx_hash: Option<H256>,
    ) -> Result<Option<PredictionEvent>> {
        let Some(topic) = topics.first().copied() else {
            return Ok(None);
        };

        let submitted = self.event(SUBMITTED_EVENT)?;
        let revealed = self.event(REVEALED_EVENT)?;
        let raw = RawLog { topics, data };

        if topic == submitted.signature() {
            let log = submitted.parse_log(raw).map_err(decode_error)?;
            return Ok(Some(PredictionEvent::Submitted {
                predictor: address_param(&log, "predictor")?,
                target_block: block_param(&log, "targetBlock")?,
                predicted_hash: hash_param(&log, "predictedHash")?,
                block_number,
                tx_hash,
            }));
        }

        if topic == revealed.signature() {
            let log = revealed.parse_log(raw).map_err(decode_error)?;
            return Ok(Some(PredictionEvent::Revealed {
                predictor: address_param(&log, "predictor")?,
                target_block: block_param(&log, "targetBlock")?,
                predicted_hash: hash_param(&log, "predictedHash")?,
                actual_hash: hash_param(&log, "actualHash")?,
                is_correct: bool_param(&log, "isCorrect")?,
                block_number,
                tx_hash,
            }));
        }

        Ok(None)
    }
}

fn decode_error(e: ethabi::Error) -> BlockcastError {
    BlockcastError::contract(format!("Failed to decode event log: {}", e))
}

fn param(log: &ethabi::Log, name: &str) -> Result<Token> {
    log.params
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.clone())
        .ok_or_else(|| BlockcastError::contract(format!("Event log is missing {}", name)))
}

fn address_param(log: &ethabi::Log, name: &str) -> Result<web3::types::Address> {
    param(log, name)?
        .into_address()
        .ok_or_else(|| BlockcastError::contract(format!("{} is not an address", name)))
}

fn block_param(log: &ethabi::Log, name: &str) -> Result<u64> {
    let value: U256 = param(log, name)?
        .into_uint()
        .ok_or_else(|| BlockcastError::contract(format!("{} is not a uint", name)))?;
    if value > U256::from(u64::MAX) {
        return Err(BlockcastError::contract(format!(
            "{} out of range: {}",
            name, value
        )));
    }
    Ok(value.as_u64())
}

fn hash_param(log: &ethabi::Log, name: &str) -> Result<H256> {
    let bytes = param(log, name)?
        .into_fixed_bytes()
        .ok_or_else(|| BlockcastError::contract(format!("{} is not bytes32", name)))?;
    hash_from_slice(&bytes)
}

fn bool_param(log: &ethabi::Log, name: &str) -> Result<bool> {
    param(log, name)?
        .into_bool()
        .ok_or_else(|| BlockcastError::contract(format!("{} is not a bool", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_hash;
    use web3::types::Address;

    fn predictor_topic(predictor: Address) -> H256 {
        H256::from(predictor)
    }

    #[test]
    fn test_event_topics() {
        let abi = PredictionAbi::load().unwrap();
        assert_eq!(
            abi.submitted_topic().unwrap(),
            parse_hash("0x093ffdef59de7e245b39d01d11e5e96f8fabf11d46f12b8bc40867f094d04218")
                .unwrap()
        );
        assert_eq!(
            abi.revealed_topic().unwrap(),
            parse_hash("0x4f8ab9b86b73460be8b154bc098cdcc9f731ca34f51f7b99f1fa888f4bd00cd6")
                .unwrap()
        );
    }

    #[test]
    fn test_decode_submitted() {
        let abi = PredictionAbi::load().unwrap();
        let predictor = Address::repeat_byte(0x42);
        let data = ethabi::encode(&[
            Token::Uint(U256::from(101u64)),
            Token::FixedBytes(vec![0xaa; 32]),
        ]);

        let event = abi
            .decode_raw(
                vec![abi.submitted_topic().unwrap(), predictor_topic(predictor)],
                data,
                Some(100),
                Some(H256::repeat_byte(0x01)),
            )
            .unwrap()
            .unwrap();

        assert_eq!(
            event,
            PredictionEvent::Submitted {
                predictor,
                target_block: 101,
                predicted_hash: H256::repeat_byte(0xaa),
                block_number: Some(100),
                tx_hash: Some(H256::repeat_byte(0x01)),
            }
        );
    }

    #[test]
    fn test_decode_revealed() {
        let abi = PredictionAbi::load().unwrap();
        let predictor = Address::repeat_byte(0x42);
        let data = ethabi::encode(&[
            Token::Uint(U256::from(101u64)),
            Token::FixedBytes(vec![0xaa; 32]),
            Token::FixedBytes(vec![0xbb; 32]),
            Token::Bool(false),
        ]);

        let event = abi
            .decode_raw(
                vec![abi.revealed_topic().unwrap(), predictor_topic(predictor)],
                data,
                None,
                None,
            )
            .unwrap()
            .unwrap();

        match event {
            PredictionEvent::Revealed {
                target_block,
                actual_hash,
                is_correct,
                ..
            } => {
                assert_eq!(target_block, 101);
                assert_eq!(actual_hash, H256::repeat_byte(0xbb));
                assert!(!is_correct);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unknown_topic_is_skipped() {
        let abi = PredictionAbi::load().unwrap();
        assert!(abi
            .decode_raw(vec![H256::repeat_byte(0x77)], vec![], None, None)
            .unwrap()
            .is_none());
        assert!(abi.decode_raw(vec![], vec![], None, None).unwrap().is_none());
    }

    #[test]
    fn test_decode_log_from_json() {
        let abi = PredictionAbi::load().unwrap();
        let data = ethabi::encode(&[
            Token::Uint(U256::from(7u64)),
            Token::FixedBytes(vec![0x11; 32]),
        ]);
        let log: Log = serde_json::from_value(serde_json::json!({
            "address": format!("0x{}", "99".repeat(20)),
            "topics": [
                format!("{:?}", abi.submitted_topic().unwrap()),
                format!("{:?}", predictor_topic(Address::repeat_byte(0x42))),
            ],
            "data": format!("0x{}", hex::encode(data)),
            "blockNumber": "0x6",
        }))
        .unwrap();

        let event = abi.decode_log(&log).unwrap().unwrap();
        assert_eq!(event.target_block(), 7);
        assert_eq!(event.predictor(), Address::repeat_byte(0x42));
    }
}
