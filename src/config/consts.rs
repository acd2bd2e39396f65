// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Conventional relationship used when a connection names none
pub const DEFAULT_RELATIONSHIP: &str = "success";
/// Engine steps between cooperative yields to the async runtime
pub const DEFAULT_YIELD_INTERVAL: usize = 64;
