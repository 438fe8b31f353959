use crate::chain::ChainReader;
use crate::error::Result;
use crate::network::key_address;
use web3::signing::SecretKey;
use web3::types::Address;

/// Connection context handed to every protocol operation: who is acting,
/// whether they can sign, and which chain they are talking to.
#[derive(Clone)]
pub struct Session {
    account: Address,
    signer: Option<SecretKey>,
    chain_id: u64,
}

impl Session {
    pub fn with_signer(key: SecretKey, chain_id: u64) -> Self {
        Self {
            account: key_address(&key),
            signer: Some(key),
            chain_id,
        }
    }

    pub fn read_only(account: Address, chain_id: u64) -> Self {
        Self {
            account,
            signer: None,
            chain_id,
        }
    }

    /// Build a session against the chain the reader is actually connected to.
    pub async fn connect<R>(reader: &R, key: Option<SecretKey>, account: Address) -> Result<Self>
    where
        R: ChainReader + ?Sized,
    {
        let chain_id = reader.chain_id().await?;
        let session = match key {
            Some(key) => Self::with_signer(key, chain_id),
            None => Self::read_only(account, chain_id),
        };
        tracing::debug!(
            "Session for {:?} on chain {} (signer: {})",
            session.account,
            chain_id,
            session.can_sign()
        );
        Ok(session)
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn signer(&self) -> Option<&SecretKey> {
        self.signer.as_ref()
    }

    pub fn can_sign(&self) -> bool {
        self.signer.is_some()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("can_sign", &self.signer.is_some())
            .finish()
    }
}
