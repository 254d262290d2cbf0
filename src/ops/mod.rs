//! Operational concerns: logging setup.

pub mod telemetry;

pub use telemetry::{init_tracing, LogHandle};
