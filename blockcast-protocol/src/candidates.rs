use crate::error::{PredictionError, Result};
use blockcast_core::{BlockSnapshot, H256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

pub const CANDIDATE_COUNT: usize = 4;

/// Four candidate hashes for one target block, in salt order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSet([H256; CANDIDATE_COUNT]);

impl CandidateSet {
    pub fn as_slice(&self) -> &[H256] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, H256> {
        self.0.iter()
    }

    pub fn get(&self, salt: usize) -> Option<&H256> {
        self.0.get(salt)
    }

    pub fn contains(&self, hash: &H256) -> bool {
        self.0.contains(hash)
    }

    pub fn into_inner(self) -> [H256; CANDIDATE_COUNT] {
        self.0
    }
}

impl std::ops::Index<usize> for CandidateSet {
    type Output = H256;

    fn index(&self, salt: usize) -> &H256 {
        &self.0[salt]
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a H256;
    type IntoIter = std::slice::Iter<'a, H256>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Derive the candidates for `target_block` from the latest block hash.
///
/// Candidate `i` is `keccak256(latest_hash ‖ target_block ‖ i)` with the
/// block number and salt encoded as 32-byte big-endian words.
pub fn generate(latest_hash: &[u8], target_block: impl Into<U256>) -> Result<CandidateSet> {
    if latest_hash.len() != 32 {
        return Err(PredictionError::InvalidHashLength(latest_hash.len()));
    }

    Ok(derive_set(latest_hash, target_block.into()))
}

/// Candidates for the block after `snapshot`, the block a submission made
/// now commits to. The web dApp salts with the head's own number instead, so
/// its suggestions differ from these for the same head.
pub fn for_snapshot(snapshot: &BlockSnapshot) -> CandidateSet {
    derive_set(snapshot.hash.as_bytes(), U256::from(snapshot.next_target()))
}

fn derive_set(latest_hash: &[u8], target_block: U256) -> CandidateSet {
    let mut candidates = [H256::zero(); CANDIDATE_COUNT];
    for (salt, slot) in candidates.iter_mut().enumerate() {
        *slot = derive(latest_hash, target_block, U256::from(salt));
    }
    CandidateSet(candidates)
}

fn derive(latest_hash: &[u8], target_block: U256, salt: U256) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(latest_hash);
    hasher.update(word(target_block));
    hasher.update(word(salt));
    H256::from_slice(&hasher.finalize())
}

fn word(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockcast_core::types::parse_hash;

    fn hashes(texts: [&str; 4]) -> Vec<H256> {
        texts.iter().map(|t| parse_hash(t).unwrap()).collect()
    }

    #[test]
    fn test_reference_vector() {
        let set = generate(&[0xaa; 32], 100u64).unwrap();
        assert_eq!(
            set.as_slice(),
            hashes([
                "0x03c9942a49c3b0736b0df7779ba1c6a2350b2633f0618332319b13716390dfcc",
                "0x62e98561881cfc50f3af52f384289a5a2a29b46c90d635b67877cafbe38f596a",
                "0x2c8196e87579ba41a983578fc648929102762a9b20018a72350b1d97dc08ab44",
                "0x777f41dd291dd09900e1d35d74d87bf42ab19e6ac2242e11a582c26f4e023582",
            ])
            .as_slice()
        );
    }

    #[test]
    fn test_zero_hash_genesis_target() {
        let set = generate(&[0u8; 32], 0u64).unwrap();
        assert_eq!(
            set.as_slice(),
            hashes([
                "0x46700b4d40ac5c35af2c22dda2787a91eb567b06c924a8fb8ae9a05b20c08c21",
                "0xcbfe4baa920060fc34aa65135b74b83fa81df36f6e21d90c8301c8810d2c89d9",
                "0xdfc7054f7e556cdc2d4cbcede032e6e55d7f7f2f1e0d9cc5c2429cc32806b2ba",
                "0x7ca924efc0694161c95cdefc7b665a34b6dfea5521071498c317109fa1f83d18",
            ])
            .as_slice()
        );
    }

    #[test]
    fn test_generation_is_deterministic_and_distinct() {
        let a = generate(&[0x5c; 32], 12_345u64).unwrap();
        let b = generate(&[0x5c; 32], 12_345u64).unwrap();
        assert_eq!(a, b);

        for i in 0..CANDIDATE_COUNT {
            for j in (i + 1)..CANDIDATE_COUNT {
                assert_ne!(a[i], a[j]);
            }
        }

        let other_target = generate(&[0x5c; 32], 12_346u64).unwrap();
        assert!(a.iter().all(|h| !other_target.contains(h)));
    }

    #[test]
    fn test_wrong_hash_length() {
        assert!(matches!(
            generate(&[0u8; 31], 1u64),
            Err(PredictionError::InvalidHashLength(31))
        ));
        assert!(matches!(
            generate(&[0u8; 33], 1u64),
            Err(PredictionError::InvalidHashLength(33))
        ));
    }

    #[test]
    fn test_for_snapshot_targets_next_block() {
        let snapshot = BlockSnapshot {
            number: 99,
            hash: H256::repeat_byte(0xaa),
            timestamp: 0,
        };
        assert_eq!(for_snapshot(&snapshot), generate(&[0xaa; 32], 100u64).unwrap());
    }
}
