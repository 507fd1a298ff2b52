//! Domain layer for the Sequencer
//!
//! Pure state, no I/O.

pub mod block;
pub mod instance;
pub mod mailbox;
pub mod settlement;

pub use block::{BlockBuilder, BlockTag, OpenBlock, SealedBlock};
pub use instance::{ActiveInstance, InstanceRecord, InstanceStatus};
pub use mailbox::{Delivery, Mailbox};
pub use settlement::SettlementTracker;
