// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for consistent, human-readable output
//! and [`StructuredLog`] to emit a `tracing` event at the level documented on
//! the type, with the message's fields attached. [`engine::RunStarted`] also
//! opens the span a run executes in.
//!
//! # Organization
//!
//! * `graph` - edge connections, rejected cycles, freezing and validation
//! * `engine` - run lifecycle and routing events
//! * `unit` - unit failures
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_pipeworks::observability::messages::graph::EdgeConnected;
//!
//! let msg = EdgeConnected {
//!     upstream: "numbers",
//!     relationship: "success",
//!     downstream: "add",
//! };
//!
//! tracing::debug!("{}", msg);
//! ```

pub mod engine;
pub mod graph;
pub mod unit;

/// A message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a `tracing` event.
    fn log(&self);
}
