//! # xt-sequencer
//!
//! Per-chain Sequencer of the cross-chain transaction stack.
//!
//! ## Responsibilities
//!
//! - **Block building**: strictly sequential blocks, one open at a time,
//!   tagged with the period and target superblock they were opened under.
//! - **Instance participation (SCP)**: simulate this chain's share of an
//!   XT, exchange mailbox messages with peers, vote, apply the decision.
//! - **Settlement (SBCP)**: request a settlement proof once the last block of
//!   an ended period seals, forward it to the Publisher, apply rollbacks.
//!
//! ```text
//!  StartInstance ──▶ simulate ──▶ read miss? ──▶ wait for Mailbox ──┐
//!                       ▲                                          │
//!                       └──────────── relay tx prepended ◀─────────┘
//!                       │
//!                       ▼
//!                     Vote ──▶ Decided ──▶ txs into open block
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xt_sequencer::{SequencerService, SequencerDependencies, SequencerConfig};
//!
//! let service = SequencerService::new(SequencerDependencies {
//!     engine, network, prover,
//!     config: SequencerConfig::for_chain(ChainId(1)),
//! })?;
//! tokio::spawn(forward_bus_events(bus.subscribe(filter), chain, service.inbox()));
//! service.run(shutdown).await;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod state;

pub use adapters::{forward_bus_events, BusSequencerNetwork};
pub use config::SequencerConfig;
pub use domain::{BlockTag, Delivery, InstanceStatus};
pub use error::{SequencerError, SequencerResult};
pub use events::{SequencerEvent, SequencerOutput};
pub use ports::{
    ExecutionEngine, SequencerApi, SequencerNetwork, SettlementProver, SimulationOutcome,
    SimulationRequest,
};
pub use service::{SequencerDependencies, SequencerService};
pub use state::{SequencerState, SequencerStatus};
