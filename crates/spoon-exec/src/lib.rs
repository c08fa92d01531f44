#![forbid(unsafe_code)]
//! spoon-exec: turns a `Job` into a running pipeline.
//!
//! The engine builds the formula context once from the preamble, opens the
//! sources a command needs, wires exactly one operation and drains the
//! result into a CSV sink.

pub mod job;
pub mod metrics;
pub mod runtime;

pub use job::{Command, Job, Preamble};
pub use runtime::{Engine, ExecError, RunSummary};
