//! Adapters layer

pub mod bus_network;

pub use bus_network::{forward_bus_events, BusPublisherNetwork};
