//! # Integration Tests
//!
//! Publisher and sequencers run their real event loops, connected by the
//! bus adapters. Execution, proving and L1 use the node's dev adapters.

pub mod flows;
pub mod harness;

pub use harness::{eventually, test_config, Network};
