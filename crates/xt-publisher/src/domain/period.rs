//! Period and superblock lifecycle
//!
//! The Publisher's single authoritative counter. A period builds exactly one
//! superblock; the proof window bounds how far building may run ahead of
//! finalization.

use crate::error::{PublisherError, PublisherResult};
use shared_types::{PeriodId, Rollback, StartPeriod, SuperblockNumber, SuperblockRef};

#[derive(Debug, Clone)]
pub struct PeriodLifecycle {
    current_period: PeriodId,
    target_superblock: SuperblockNumber,
    last_finalized: SuperblockRef,
    proof_window: u64,
    /// Last sequence number handed out in the current period.
    sequence: u64,
}

impl PeriodLifecycle {
    /// Before the first period, nothing past `genesis` is being built.
    pub fn new(genesis: SuperblockRef, proof_window: u64) -> Self {
        Self {
            current_period: 0,
            target_superblock: genesis.number,
            last_finalized: genesis,
            proof_window,
            sequence: 0,
        }
    }

    /// Resume from an existing position.
    pub fn resume(
        current_period: PeriodId,
        target_superblock: SuperblockNumber,
        last_finalized: SuperblockRef,
        proof_window: u64,
    ) -> Self {
        Self {
            current_period,
            target_superblock,
            last_finalized,
            proof_window,
            sequence: 0,
        }
    }

    pub fn current_period(&self) -> PeriodId {
        self.current_period
    }

    pub fn target_superblock(&self) -> SuperblockNumber {
        self.target_superblock
    }

    pub fn last_finalized(&self) -> SuperblockRef {
        self.last_finalized
    }

    pub fn last_sequence(&self) -> u64 {
        self.sequence
    }

    /// The superblock proofs are being collected for.
    pub fn next_to_prove(&self) -> SuperblockNumber {
        self.last_finalized.number + 1
    }

    /// Highest target allowed before finalization catches up.
    pub fn window_limit(&self) -> SuperblockNumber {
        self.next_to_prove() + self.proof_window
    }

    /// Advance to the next period, unless the proof window would be exceeded.
    pub fn advance(&mut self) -> PublisherResult<StartPeriod> {
        let new_target = self.target_superblock + 1;
        let limit = self.window_limit();
        if new_target > limit {
            return Err(PublisherError::ProofWindowExceeded { new_target, limit });
        }
        self.current_period += 1;
        self.target_superblock = new_target;
        self.sequence = 0;
        Ok(StartPeriod {
            period_id: self.current_period,
            target_superblock: new_target,
        })
    }

    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Reset building to just past the last finalized superblock, continuing
    /// in `period_id`.
    pub fn rollback(&mut self, period_id: PeriodId) -> Rollback {
        if period_id != self.current_period {
            self.current_period = period_id;
            self.sequence = 0;
        }
        self.target_superblock = self.next_to_prove();
        Rollback::to_finalized(period_id, self.last_finalized)
    }

    /// Record a finalization. Returns `false` for anything not past the
    /// current last finalized superblock.
    pub fn finalize(&mut self, superblock: SuperblockRef) -> bool {
        if superblock.number <= self.last_finalized.number {
            return false;
        }
        self.last_finalized = superblock;
        if self.target_superblock < superblock.number {
            self.target_superblock = superblock.number;
        }
        true
    }
}
