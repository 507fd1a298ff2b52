//! # Cross-Chain Protocol Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── harness.rs    # Full network on the in-memory bus
//! │   └── flows.rs      # End-to-end protocol flows
//! └── benches/
//!     └── protocol_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p xt-tests
//! cargo test -p xt-tests integration::
//! cargo bench -p xt-tests
//! ```

#![allow(dead_code)]

pub mod integration;
