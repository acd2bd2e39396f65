// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic the crate emits goes through a message struct in
//! [`messages`]. Each struct implements `Display` for the human-readable line
//! and [`messages::StructuredLog`] for the `tracing` event with its fields, so
//! log text lives in one place instead of being scattered through the engine.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::graph` - graph assembly, cycle rejection and freezing
//! * `messages::engine` - run lifecycle, source exhaustion, dropped records
//! * `messages::unit` - unit failures and lifecycle hook failures
//!
//! The crate never installs a subscriber on its own. Applications choose one;
//! [`init_tracing`] is a convenience for binaries and demos.
//!
//! # Usage
//!
//! ```rust
//! use the_pipeworks::observability::messages::engine::SourceExhausted;
//! use the_pipeworks::observability::messages::StructuredLog;
//!
//! SourceExhausted { unit: "numbers", records_pulled: 10 }.log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .try_init()
        .is_ok()
}
