#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # opprof
//!
//! Built-in workloads, sweep plan files and the results log used by the
//! `opprof` binary. The measurement harness itself lives in
//! [`opprof_profiler`].

pub use opprof_core;
pub use opprof_profiler;

pub mod plan;
pub mod report;
pub mod workloads;
