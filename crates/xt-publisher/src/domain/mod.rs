//! Publisher domain: period lifecycle, proof aggregation, admission and
//! vote collection.

pub mod clock;
pub mod period;
pub mod proofs;
pub mod scheduler;
pub mod votes;

pub use clock::PeriodClock;
pub use period::PeriodLifecycle;
pub use proofs::{ProofAggregator, ProofRejection};
pub use scheduler::InstanceScheduler;
pub use votes::{InstanceVotes, Tally};
