//! # Error Types
//!
//! Errors shared across actors.

use thiserror::Error;

/// Encoding failure for in-process payloads (relay transactions).
#[derive(Debug, Error)]
pub enum CodecError {
    /// bincode rejected the value or the bytes.
    #[error("Codec error: {0}")]
    Bincode(#[from] bincode::Error),
}
