//! Settlement pipeline bookkeeping
//!
//! Tracks which periods have had a settlement proof requested and caches the
//! most recent proof for quiescent periods.

use shared_types::{PeriodId, Proof, SuperblockNumber};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct SettlementTracker {
    /// Target superblock of every period seen (StartPeriod or Rollback).
    targets: BTreeMap<PeriodId, SuperblockNumber>,
    /// Periods with a proof request in flight or answered.
    requested: BTreeMap<PeriodId, SuperblockNumber>,
    /// Requested periods whose proof came back.
    completed: BTreeSet<PeriodId>,
    last_proof: Option<Proof>,
}

impl SettlementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_period(&mut self, period_id: PeriodId, target: SuperblockNumber) {
        self.targets.insert(period_id, target);
    }

    pub fn target_of(&self, period_id: PeriodId) -> Option<SuperblockNumber> {
        self.targets.get(&period_id).copied()
    }

    /// Known periods in `[from, to)`, ascending.
    pub fn periods_between(&self, from: PeriodId, to: PeriodId) -> Vec<PeriodId> {
        if from >= to {
            return Vec::new();
        }
        self.targets.range(from..to).map(|(period, _)| *period).collect()
    }

    pub fn last_proof(&self) -> Option<&Proof> {
        self.last_proof.as_ref()
    }

    /// Mark `period_id` as requested. Returns `false` if it already was.
    pub fn begin_request(&mut self, period_id: PeriodId, target: SuperblockNumber) -> bool {
        if self.requested.contains_key(&period_id) {
            return false;
        }
        self.requested.insert(period_id, target);
        true
    }

    /// Whether a request for an earlier period is still unanswered.
    pub fn awaiting_before(&self, period_id: PeriodId) -> bool {
        self.requested
            .range(..period_id)
            .any(|(period, _)| !self.completed.contains(period))
    }

    /// Accept a prover result. Results for requests dropped by a rollback
    /// come back as `None`.
    pub fn complete(
        &mut self,
        period_id: PeriodId,
        target: SuperblockNumber,
        proof_data: Vec<u8>,
    ) -> Option<Proof> {
        if self.requested.get(&period_id) != Some(&target) {
            return None;
        }
        let proof = Proof {
            period_id,
            superblock_number: target,
            proof_data,
        };
        self.completed.insert(period_id);
        if self
            .last_proof
            .as_ref()
            .map_or(true, |cached| cached.period_id < period_id)
        {
            self.last_proof = Some(proof.clone());
        }
        Some(proof)
    }

    /// The cached proof relabelled for a period that produced no blocks.
    pub fn resend_for(&self, period_id: PeriodId) -> Option<Proof> {
        let target = self.target_of(period_id)?;
        self.last_proof.as_ref().map(|cached| Proof {
            period_id,
            superblock_number: target,
            proof_data: cached.proof_data.clone(),
        })
    }

    /// Forget everything above the finalized superblock.
    pub fn rollback(&mut self, superblock_number: SuperblockNumber) {
        self.requested.retain(|_, target| *target <= superblock_number);
        let requested = &self.requested;
        self.completed.retain(|period| requested.contains_key(period));
        if self
            .last_proof
            .as_ref()
            .is_some_and(|p| p.superblock_number > superblock_number)
        {
            self.last_proof = None;
        }
    }

    /// Drop bookkeeping for periods before `oldest`.
    pub fn prune_before(&mut self, oldest: PeriodId) {
        self.targets = self.targets.split_off(&oldest);
        self.requested = self.requested.split_off(&oldest);
        self.completed = self.completed.split_off(&oldest);
    }
}
