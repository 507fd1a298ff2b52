//! # Node Container
//!
//! Configuration and the actor instances built from it.

pub mod actors;
pub mod config;

pub use actors::{ContainerError, NodeContainer, NodePublisher, NodeSequencer};
pub use config::{ConfigError, NodeConfig, SequencerDefaults};
