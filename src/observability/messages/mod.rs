// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit it at its level with structured fields.
//!
//! # Usage Pattern
//!
//! ```rust
//! use shardwood::observability::messages::collector::BarrierCompleted;
//! use shardwood::message::MessageKind;
//!
//! let msg = BarrierCompleted {
//!     node: "collector",
//!     kind: MessageKind::Occurrence,
//!     workers: 4,
//! };
//!
//! tracing::info!("{}", msg);
//! ```

pub mod collector;
pub mod supervisor;
pub mod transport;
pub mod worker;

use tracing::Span;

/// A log event that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the event.
    fn log(&self);

    /// Build a span carrying the same fields.
    fn span(&self, name: &str) -> Span;
}
