//! # Adapter Implementations
//!
//! Development collaborators plugged into the Publisher and Sequencer ports.
//! The network side is the shared bus adapters each actor crate ships.
//!
//! ```text
//!  ┌──────────────┐  SuperblockProver   ┌───────────┐
//!  │  Publisher   │ ──────────────────▶ │ DevProver │ ◀── SettlementProver ──┐
//!  └──────────────┘                     └───────────┘                        │
//!        │ SettlementLayer                                          ┌────────────────┐
//!        ▼                                                          │ Sequencer × N  │
//!  ┌──────────────┐  SuperblockFinalized (bus)                      │ ExecutionEngine│
//!  │ SimulatedL1  │ ──────────────────────────────────────────────▶ │ = DevExecution │
//!  └──────────────┘                                                 └────────────────┘
//! ```

pub mod execution;
pub mod prover;
pub mod settlement;

pub use execution::{chain_address, DevExecutionEngine, DevOp};
pub use prover::DevProver;
pub use settlement::SimulatedL1;
