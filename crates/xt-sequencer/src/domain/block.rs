//! Block builder
//!
//! NoOpenBlock -> Open -> Sealed. Numbers start at 1 and never skip.

use crate::error::{SequencerError, SequencerResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{BlockHeader, ChainId, Hash, PeriodId, SuperblockNumber, Transaction};

/// Period and target superblock a block was opened under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTag {
    pub period_id: PeriodId,
    pub target_superblock: SuperblockNumber,
}

/// The block currently being filled.
#[derive(Debug, Clone)]
pub struct OpenBlock {
    pub number: u64,
    pub tag: BlockTag,
    pub transactions: Vec<Transaction>,
}

/// A sealed block and its contents.
#[derive(Debug, Clone)]
pub struct SealedBlock {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Per-chain block sequence.
#[derive(Debug)]
pub struct BlockBuilder {
    chain_id: ChainId,
    sealed: Vec<SealedBlock>,
    open: Option<OpenBlock>,
    /// Number of the newest sealed block, kept across pruning.
    head_number: u64,
    head_hash: Hash,
}

impl BlockBuilder {
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            sealed: Vec::new(),
            open: None,
            head_number: 0,
            head_hash: [0u8; 32],
        }
    }

    /// Number of the newest sealed block (0 before the first seal).
    pub fn head(&self) -> u64 {
        self.head_number
    }

    pub fn open_block(&self) -> Option<&OpenBlock> {
        self.open.as_ref()
    }

    pub fn open_tag(&self) -> Option<BlockTag> {
        self.open.as_ref().map(|b| b.tag)
    }

    pub fn sealed(&self) -> &[SealedBlock] {
        &self.sealed
    }

    pub fn begin(&mut self, number: u64, tag: BlockTag) -> SequencerResult<()> {
        let expected = self.head_number + 1;
        if number != expected {
            return Err(SequencerError::BlockNotSequential {
                expected,
                got: number,
            });
        }
        if self.open.is_some() {
            return Err(SequencerError::BlockAlreadyOpen);
        }
        self.open = Some(OpenBlock {
            number,
            tag,
            transactions: Vec::new(),
        });
        Ok(())
    }

    pub fn push(&mut self, tx: Transaction) -> SequencerResult<()> {
        let block = self.open.as_mut().ok_or(SequencerError::NoOpenBlock)?;
        block.transactions.push(tx);
        Ok(())
    }

    pub fn extend(&mut self, txs: Vec<Transaction>) -> SequencerResult<()> {
        let block = self.open.as_mut().ok_or(SequencerError::NoOpenBlock)?;
        block.transactions.extend(txs);
        Ok(())
    }

    /// Close the open block with the engine's post-state root.
    pub fn seal(&mut self, state_root: Hash) -> SequencerResult<BlockHeader> {
        let block = self.open.take().ok_or(SequencerError::NoOpenBlock)?;
        let hash = block_hash(self.chain_id, &block, &self.head_hash, &state_root);
        let header = BlockHeader {
            chain_id: self.chain_id,
            number: block.number,
            hash,
            parent_hash: self.head_hash,
            state_root,
            period_id: block.tag.period_id,
            target_superblock: block.tag.target_superblock,
        };
        self.head_number = header.number;
        self.head_hash = header.hash;
        self.sealed.push(SealedBlock {
            header: header.clone(),
            transactions: block.transactions,
        });
        Ok(header)
    }

    /// Newest sealed block tagged with `period_id`.
    pub fn last_sealed_in_period(&self, period_id: PeriodId) -> Option<&BlockHeader> {
        self.sealed
            .iter()
            .rev()
            .map(|b| &b.header)
            .find(|h| h.period_id == period_id)
    }

    /// Drop the open block and every sealed block targeting a superblock
    /// above `superblock_number`. Returns the number of sealed blocks removed.
    pub fn rollback(&mut self, superblock_number: SuperblockNumber) -> usize {
        self.open = None;
        let before = self.sealed.len();
        self.sealed
            .retain(|b| b.header.target_superblock <= superblock_number);
        let removed = before - self.sealed.len();
        if removed > 0 {
            match self.sealed.last() {
                Some(last) => {
                    self.head_number = last.header.number;
                    self.head_hash = last.header.hash;
                }
                None => {
                    // Everything since genesis was unfinalized.
                    self.head_number = 0;
                    self.head_hash = [0u8; 32];
                }
            }
        }
        removed
    }

    /// Forget finalized blocks, keeping the newest one as the rollback anchor.
    pub fn prune_finalized(&mut self, superblock_number: SuperblockNumber) {
        let anchor = self
            .sealed
            .iter()
            .rposition(|b| b.header.target_superblock <= superblock_number);
        if let Some(index) = anchor {
            self.sealed.drain(..index);
        }
    }
}

fn block_hash(chain_id: ChainId, block: &OpenBlock, parent: &Hash, state_root: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(chain_id.0.to_be_bytes());
    hasher.update(block.number.to_be_bytes());
    hasher.update(parent);
    hasher.update(state_root);
    hasher.update(block.tag.period_id.to_be_bytes());
    hasher.update(block.tag.target_superblock.to_be_bytes());
    for tx in &block.transactions {
        hasher.update(tx.hash());
    }
    hasher.finalize().into()
}
