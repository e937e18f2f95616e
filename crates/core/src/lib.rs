//! Core error and result types shared across the opprof workspace.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod error;
mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
