// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Operational events are message structs implementing `Display` and
//! [`messages::StructuredLog`], so log text lives in one place and every event
//! carries structured fields (node name, counts, durations) alongside the
//! human-readable line.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::worker` - allocation, reconfiguration and graph execution
//! * `messages::collector` - barrier rounds and upstream forwarding
//! * `messages::transport` - sockets, communicators and the listener
//! * `messages::supervisor` - child process lifecycle
//!
//! # Usage
//!
//! ```rust
//! use shardwood::observability::messages::{worker::ConfigurationCompleted, StructuredLog};
//!
//! ConfigurationCompleted {
//!     node: "worker000",
//!     duration: std::time::Duration::from_millis(3),
//! }
//! .log();
//! ```

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
