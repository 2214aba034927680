// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for collector barrier events.

use crate::message::MessageKind;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// One more worker reached a barrier round.
///
/// # Log Level
/// `debug!` - Per-message detail
pub struct BarrierProgress<'a> {
    pub node: &'a str,
    pub kind: MessageKind,
    pub detail: &'a str,
    pub received: usize,
    pub expected: usize,
}

impl Display for BarrierProgress<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: seen {} of type {} ({}/{})",
            self.node, self.kind, self.detail, self.received, self.expected
        )
    }
}

impl StructuredLog for BarrierProgress<'_> {
    fn log(&self) {
        tracing::debug!(
            node = self.node,
            kind = %self.kind,
            detail = self.detail,
            received = self.received,
            expected = self.expected,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "barrier_progress",
            span_name = name,
            node = self.node,
            kind = %self.kind,
        )
    }
}

/// Every worker reached the round; one aggregated message goes upstream.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardwood::observability::messages::collector::BarrierCompleted;
/// use shardwood::message::MessageKind;
///
/// let msg = BarrierCompleted {
///     node: "collector",
///     kind: MessageKind::Transition,
///     workers: 3,
/// };
///
/// assert_eq!(msg.to_string(), "collector: transition barrier complete across 3 workers");
/// ```
pub struct BarrierCompleted<'a> {
    pub node: &'a str,
    pub kind: MessageKind,
    pub workers: usize,
}

impl Display for BarrierCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: {} barrier complete across {} workers",
            self.node, self.kind, self.workers
        )
    }
}

impl StructuredLog for BarrierCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            kind = %self.kind,
            workers = self.workers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "barrier_completed",
            span_name = name,
            node = self.node,
            kind = %self.kind,
            workers = self.workers,
        )
    }
}

/// Upstream store drained after a heartbeat round.
///
/// # Log Level
/// `debug!` - Per-round detail
pub struct UpstreamCollected<'a> {
    pub node: &'a str,
    pub datagrams: usize,
}

impl Display for UpstreamCollected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: forwarded {} datagrams upstream",
            self.node, self.datagrams
        )
    }
}

impl StructuredLog for UpstreamCollected<'_> {
    fn log(&self) {
        tracing::debug!(node = self.node, datagrams = self.datagrams, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "upstream_collected",
            span_name = name,
            node = self.node,
            datagrams = self.datagrams,
        )
    }
}

/// Collector stopped.
///
/// # Log Level
/// `info!` - Important operational event
pub struct CollectorFinished<'a> {
    pub node: &'a str,
    pub reason: &'a str,
}

impl Display for CollectorFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: stopping ({})", self.node, self.reason)
    }
}

impl StructuredLog for CollectorFinished<'_> {
    fn log(&self) {
        tracing::info!(node = self.node, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("collector_finished", span_name = name, node = self.node)
    }
}
