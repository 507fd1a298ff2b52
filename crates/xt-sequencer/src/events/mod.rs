//! Events layer

mod consumed;
mod published;

pub use consumed::*;
pub use published::*;
