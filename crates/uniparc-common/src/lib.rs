//! UniParc index common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ambient pieces shared by the loader and the query tool:
//!
//! - **Logging**: `tracing` subscriber setup writing diagnostics to stderr
//!   and, optionally, to a daily rolling file
//! - **Timing**: a run stopwatch pairing a wall-clock start time with a
//!   monotonic elapsed clock

pub mod logging;
pub mod stopwatch;

pub use stopwatch::{format_elapsed, Stopwatch};
