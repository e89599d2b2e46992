use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical content-derived identifier of a transaction.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, From, Serialize, Deserialize)]
pub struct TxId(String);

impl TxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw transaction payload as broadcast to the network.
#[derive(Debug, Clone, PartialEq, Eq, From, Serialize, Deserialize)]
pub struct RawTransaction(Vec<u8>);

impl RawTransaction {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Canonical id of this transaction: double SHA-256 of the raw payload,
    /// rendered as lowercase hex.
    pub fn id(&self) -> TxId {
        let digest = Sha256::digest(Sha256::digest(&self.0));
        TxId(base16::encode_lower(digest.as_slice()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Lifecycle states recognized by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// Tx was broadcast to the network.
    Sent,
    /// Tx was confirmed to be included into blockchain.
    Confirmed,
}

/// A tracked transaction paired with the script needed later for dependent
/// tx construction (e.g. a slashing tx).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTx {
    pub tx: RawTransaction,
    pub script: Vec<u8>,
    pub state: TxState,
}
