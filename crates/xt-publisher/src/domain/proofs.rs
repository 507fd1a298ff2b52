//! Per-chain proof collection for the next superblock to prove.

use shared_types::{ChainId, SuperblockNumber};
use std::collections::BTreeMap;

/// Why an offered proof was not cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofRejection {
    /// Not the superblock being collected.
    WrongSuperblock,
    /// An aggregate request for it is already in flight.
    AlreadyProving,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct ProofAggregator {
    collecting: Option<SuperblockNumber>,
    collected: BTreeMap<ChainId, Vec<u8>>,
    proving: Option<SuperblockNumber>,
}

impl ProofAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proving(&self) -> Option<SuperblockNumber> {
        self.proving
    }

    pub fn collected_chains(&self) -> Vec<ChainId> {
        self.collected.keys().copied().collect()
    }

    /// Cache `chain`'s proof for `number`, given that `next` is the
    /// superblock to prove.
    pub fn offer(
        &mut self,
        next: SuperblockNumber,
        chain: ChainId,
        number: SuperblockNumber,
        proof: Vec<u8>,
    ) -> Result<(), ProofRejection> {
        if number != next {
            return Err(ProofRejection::WrongSuperblock);
        }
        if self.proving == Some(number) {
            return Err(ProofRejection::AlreadyProving);
        }
        if self.collecting != Some(number) {
            self.collecting = Some(number);
            self.collected.clear();
        }
        if self.collected.contains_key(&chain) {
            return Err(ProofRejection::Duplicate);
        }
        self.collected.insert(chain, proof);
        Ok(())
    }

    pub fn covers(&self, chains: &[ChainId]) -> bool {
        chains.iter().all(|c| self.collected.contains_key(c))
    }

    /// Hand the collected proofs to the prover and clear the cache.
    pub fn start_proving(&mut self) -> Option<(SuperblockNumber, BTreeMap<ChainId, Vec<u8>>)> {
        let number = self.collecting.take()?;
        self.proving = Some(number);
        Some((number, std::mem::take(&mut self.collected)))
    }

    /// Close the in-flight request for `number`. `false` means the result is
    /// late or unknown.
    pub fn finish(&mut self, number: SuperblockNumber) -> bool {
        if self.proving != Some(number) {
            return false;
        }
        self.proving = None;
        true
    }

    /// Drop everything at or below `finalized`.
    pub fn prune(&mut self, finalized: SuperblockNumber) {
        if self.collecting.is_some_and(|n| n <= finalized) {
            self.collecting = None;
            self.collected.clear();
        }
        if self.proving.is_some_and(|n| n <= finalized) {
            self.proving = None;
        }
    }

    pub fn reset(&mut self) {
        self.collecting = None;
        self.collected.clear();
        self.proving = None;
    }
}
