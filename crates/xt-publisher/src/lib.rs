//! # xt-publisher
//!
//! The coordinating Publisher of the cross-chain transaction stack.
//!
//! ## Responsibilities
//!
//! - **Periods (SBCP)**: one superblock per period, bounded by a proof window
//!   over the last finalized superblock. Exceeding it rolls every sequencer
//!   back to the last finalized state.
//! - **Proof aggregation**: collect one settlement proof per chain for the
//!   next superblock, request the aggregate proof, publish it.
//! - **Scheduling (SCP)**: admit XT requests over disjoint chain sets, queue
//!   the rest.
//! - **Decisions**: unanimous `true` accepts, the first `false` or the
//!   decision timer rejects.
//!
//! ```text
//!            submit_request ──▶ StartInstance ──▶ participants
//!                                                    │ votes
//!  Decided ◀── all true / first false / timeout ◀────┘
//!
//!  Proof × chains ──▶ RequestSuperblockProof ──▶ ok ──▶ settlement layer
//!                                            └──▶ failure/timeout ──▶ Rollback
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xt_publisher::{PublisherService, PublisherDependencies, PublisherConfig};
//!
//! let service = Arc::new(PublisherService::new(PublisherDependencies {
//!     network, prover, settlement,
//!     config: PublisherConfig::default(),
//! })?);
//! tokio::spawn(forward_bus_events(bus.subscribe(EventFilter::for_publisher()), service.inbox()));
//! service.start_period().await?;
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

pub use adapters::{forward_bus_events, BusPublisherNetwork};
pub use config::PublisherConfig;
pub use domain::PeriodClock;
pub use error::{PublisherError, PublisherResult};
pub use events::{ProofFailure, PublisherEvent, PublisherOutput};
pub use ports::{
    PublisherApi, PublisherNetwork, SettlementLayer, SuperblockProver, SystemTimeSource,
    TimeSource,
};
pub use service::{PublisherDependencies, PublisherService};
pub use state::{PublisherState, PublisherStatus};
