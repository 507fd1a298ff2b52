//! Wall-clock period arithmetic.

use shared_types::PeriodId;
use std::time::Duration;

/// Maps unix time onto period indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodClock {
    pub genesis_time: u64,
    pub period_duration_secs: u64,
}

impl PeriodClock {
    pub fn new(genesis_time: u64, period_duration_secs: u64) -> Self {
        Self {
            genesis_time,
            period_duration_secs,
        }
    }

    /// Period index at `now`. Times before genesis map to period 0.
    pub fn period_at(&self, now: u64) -> PeriodId {
        if self.period_duration_secs == 0 {
            return 0;
        }
        now.saturating_sub(self.genesis_time) / self.period_duration_secs
    }

    /// Unix time at which `period` begins.
    pub fn period_start(&self, period: PeriodId) -> u64 {
        self.genesis_time
            .saturating_add(period.saturating_mul(self.period_duration_secs))
    }

    /// Time left until the next period boundary.
    pub fn until_next(&self, now: u64) -> Duration {
        let next = self.period_start(self.period_at(now) + 1);
        Duration::from_secs(next.saturating_sub(now).max(1))
    }
}
