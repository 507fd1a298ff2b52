//! # Node Runtime Library
//!
//! Wires one publisher and one sequencer per configured chain onto an
//! in-process event bus, with development stand-ins for the execution
//! engine, the provers and L1. The `main.rs` binary drives it.
//!
//! ## Layout
//!
//! - `container/` - configuration and actor construction
//! - `adapters/` - dev execution engine, dev prover, simulated L1
//! - `wiring/` - period ticker, block producers and demo workload

#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod container;
pub mod wiring;

pub use container::{ConfigError, ContainerError, NodeConfig, NodeContainer};
