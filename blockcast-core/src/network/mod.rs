pub mod config;
pub mod session;

pub use config::NetworkConfig;
pub use session::Session;

use crate::error::{BlockcastError, Result};
use std::str::FromStr;
use web3::signing::{Key, SecretKey, SecretKeyRef};
use web3::types::Address;

/// Parse a hex private key, with or without the `0x` prefix.
pub fn parse_signing_key(text: &str) -> Result<SecretKey> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    SecretKey::from_str(digits).map_err(|e| BlockcastError::InvalidKey(e.to_string()))
}

pub fn key_address(key: &SecretKey) -> Address {
    SecretKeyRef::new(key).address()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_address() {
        // Hardhat's well-known first dev account
        let key = parse_signing_key(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let expected =
            crate::types::parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(key_address(&key), expected);
    }

    #[test]
    fn test_invalid_signing_key() {
        assert!(matches!(
            parse_signing_key("0x1234"),
            Err(BlockcastError::InvalidKey(_))
        ));
    }
}
