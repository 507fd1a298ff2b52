//! # Runtime Drivers
//!
//! Long-running tasks that drive the actors from outside: the period
//! ticker, one block producer per chain and the demo XT workload. All stop
//! on the node's shutdown signal.

pub mod producer;
pub mod ticker;
pub mod workload;

pub use producer::{produce_once, run_block_producer};
pub use ticker::run_period_ticker;
pub use workload::{run_workload, Workload};
