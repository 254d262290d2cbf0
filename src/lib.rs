#![deny(unused, dead_code)]
#![deny(clippy::all, clippy::pedantic)]
// Module naming: common pattern in domain-driven code
#![allow(clippy::module_name_repetitions)]
// Function complexity: some functions are inherently complex
#![allow(clippy::too_many_lines)]
#![allow(clippy::too_many_arguments)]
// Documentation style: many terms don't need backticks
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// API ergonomics: prefer simplicity over must_use annotations
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
// Format strings: allow non-inlined for readability
#![allow(clippy::uninlined_format_args)]
// Numeric casts: intentional in backoff arithmetic
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
// Passing style
#![allow(clippy::needless_pass_by_value)]
// Error handling style
#![allow(clippy::result_large_err)]

//! Bifrost - supervised connectivity bridge between external messaging
//! transports and the internal command bus.
//!
//! # Module Organization
//!
//! ## Core
//! - `core::config` - Configuration parsing and validation
//! - `core::time` - Deterministic time utilities
//!
//! ## Bridge
//! - `bridge::supervisor` - Per-connection worker supervision and restarts
//! - `bridge::backoff` - Exponential restart backoff with jitter
//! - `bridge::fault` - Worker fault classification
//! - `bridge::processor` - Inbound command translation and correlation
//! - `bridge::bus` - Internal command bus seams
//!
//! ## Messaging
//! - `messaging::inbound` - External message shapes and body bounds
//! - `messaging::protocol` - Canonical envelope, commands, responses
//! - `messaging::correlation` - Time-bounded roundtrip traces
//!
//! ## Mapping
//! - `mapping` - Payload mapper trait, engines, and registry
//!
//! ## Operations
//! - `ops::telemetry` - Logging setup

// Core infrastructure
pub mod core;

// Bridge
pub mod bridge;

// Messaging
pub mod messaging;

// Mapping
pub mod mapping;

// Operations
pub mod ops;

// CLI
pub mod cli;

// Re-exports for convenience
pub use self::core::{config, time};
pub use bridge::{backoff, fault, processor, supervisor};
pub use mapping::{EngineCatalog, MapperRegistry, PayloadMapper};
pub use messaging::{correlation, inbound, protocol};
pub use ops::telemetry;
