//! # Shared Types Crate
//!
//! Types exchanged between the Publisher and the Sequencers of the cross-chain
//! transaction stack.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-actor type is defined here.
//! - **Abstract payloads**: messages carry field sets only; wire encoding is
//!   a transport concern.
//! - **Deterministic identity**: chain sets are ordered, hashes are SHA-256.

pub mod entities;
pub mod errors;
pub mod ipc;
pub mod mailbox;

pub use entities::*;
pub use errors::*;
pub use ipc::*;
pub use mailbox::*;
