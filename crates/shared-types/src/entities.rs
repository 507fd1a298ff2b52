//! # Core Domain Entities
//!
//! Identifiers and value types shared by the Publisher and every Sequencer.
//!
//! ## Clusters
//!
//! - **Identity**: `ChainId`, `InstanceId`, `Hash`, `Address`
//! - **Transactions**: `Transaction`, `TxKind`, `XtRequest`
//! - **Settlement**: `SuperblockRef`, `BlockHeader`

use crate::errors::CodecError;
use crate::mailbox::MailboxMessage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte account address.
pub type Address = [u8; 20];

/// Monotonic period identifier assigned by the Publisher.
pub type PeriodId = u64;

/// Superblock number. Superblock `0` is genesis.
pub type SuperblockNumber = u64;

/// Identifier of an independently-sequenced chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Identifier of one cross-chain instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct InstanceId(pub Hash);

impl InstanceId {
    /// Derive the identifier for the `sequence`-th instance of `period_id`.
    pub fn derive(period_id: PeriodId, sequence: u64, request: &XtRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"xt-instance");
        hasher.update(period_id.to_be_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.update(request.hash());
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..6]))
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", hex::encode(self.0))
    }
}

/// Transaction origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TxKind {
    /// User transaction submitted to a chain.
    #[default]
    User,
    /// Synthesised by a sequencer to inject an inbound mailbox message.
    MailboxRelay,
}

/// An opaque chain transaction. The execution engine owns its meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Transaction {
    /// Where the transaction came from.
    pub kind: TxKind,
    /// Encoded transaction body.
    pub data: Vec<u8>,
}

impl Transaction {
    /// Create a user transaction.
    pub fn user(data: impl Into<Vec<u8>>) -> Self {
        Self {
            kind: TxKind::User,
            data: data.into(),
        }
    }

    /// Create the inbox-injection transaction for a consumed mailbox message.
    pub fn mailbox_relay(message: &MailboxMessage) -> Result<Self, CodecError> {
        let data = bincode::serialize(message)?;
        Ok(Self {
            kind: TxKind::MailboxRelay,
            data,
        })
    }

    /// Decode the message carried by a relay transaction.
    pub fn relayed_message(&self) -> Result<Option<MailboxMessage>, CodecError> {
        match self.kind {
            TxKind::User => Ok(None),
            TxKind::MailboxRelay => Ok(Some(bincode::deserialize(&self.data)?)),
        }
    }

    /// SHA-256 of kind and body.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([self.kind as u8]);
        hasher.update(&self.data);
        hasher.finalize().into()
    }
}

/// A cross-chain transaction request, keyed by participant chain.
///
/// Chains are kept in ascending order so that participant sets and hashes
/// are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct XtRequest {
    /// Ordered transaction list per chain.
    pub transactions: BTreeMap<ChainId, Vec<Transaction>>,
}

impl XtRequest {
    /// Empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a chain's transaction list.
    pub fn with_chain(mut self, chain: ChainId, txs: Vec<Transaction>) -> Self {
        self.transactions.entry(chain).or_default().extend(txs);
        self
    }

    /// Distinct chains with at least one transaction, ascending.
    pub fn chains(&self) -> Vec<ChainId> {
        self.transactions
            .iter()
            .filter(|(_, txs)| !txs.is_empty())
            .map(|(chain, _)| *chain)
            .collect()
    }

    /// Whether the request carries transactions for `chain`.
    pub fn references(&self, chain: ChainId) -> bool {
        !self.transactions_for(chain).is_empty()
    }

    /// Transactions for one chain (empty if the chain is not referenced).
    pub fn transactions_for(&self, chain: ChainId) -> &[Transaction] {
        self.transactions
            .get(&chain)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Request restricted to the given chains.
    pub fn restricted_to(&self, chains: &[ChainId]) -> XtRequest {
        Self {
            transactions: self
                .transactions
                .iter()
                .filter(|(chain, _)| chains.contains(chain))
                .map(|(chain, txs)| (*chain, txs.clone()))
                .collect(),
        }
    }

    /// SHA-256 over chains and transaction hashes in chain order.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        for (chain, txs) in &self.transactions {
            hasher.update(chain.0.to_be_bytes());
            hasher.update((txs.len() as u64).to_be_bytes());
            for tx in txs {
                hasher.update(tx.hash());
            }
        }
        hasher.finalize().into()
    }
}

/// A superblock identified by number and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct SuperblockRef {
    /// Superblock number.
    pub number: SuperblockNumber,
    /// Superblock hash.
    pub hash: Hash,
}

impl SuperblockRef {
    /// Create a reference.
    pub fn new(number: SuperblockNumber, hash: Hash) -> Self {
        Self { number, hash }
    }
}

/// Header of a sealed sequencer block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Chain that produced the block.
    pub chain_id: ChainId,
    /// Block number (strictly sequential).
    pub number: u64,
    /// Hash of this block.
    pub hash: Hash,
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// State root after applying the block.
    pub state_root: Hash,
    /// Period the block was opened in.
    pub period_id: PeriodId,
    /// Superblock the block contributes to.
    pub target_superblock: SuperblockNumber,
}
