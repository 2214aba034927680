// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for transport and listener events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A socket bound its local address.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SocketBound<'a> {
    pub role: &'a str,
    pub addr: &'a str,
}

impl Display for SocketBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} socket bound to {}", self.role, self.addr)
    }
}

impl StructuredLog for SocketBound<'_> {
    fn log(&self) {
        tracing::info!(role = self.role, addr = self.addr, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("socket_bound", span_name = name, role = self.role, addr = self.addr)
    }
}

/// A connecting socket reached its peer.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SocketConnected<'a> {
    pub role: &'a str,
    pub addr: &'a str,
    pub attempts: u32,
}

impl Display for SocketConnected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} socket connected to {} after {} attempt(s)",
            self.role, self.addr, self.attempts
        )
    }
}

impl StructuredLog for SocketConnected<'_> {
    fn log(&self) {
        tracing::info!(
            role = self.role,
            addr = self.addr,
            attempts = self.attempts,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "socket_connected",
            span_name = name,
            role = self.role,
            addr = self.addr,
        )
    }
}

/// Listener staged a graph update and raised the reconfiguration flag.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphUpdateReceived<'a> {
    pub node: &'a str,
    pub graph: &'a str,
    pub nodes: usize,
}

impl Display for GraphUpdateReceived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: staged graph '{}' ({} nodes) for the next heartbeat",
            self.node, self.graph, self.nodes
        )
    }
}

impl StructuredLog for GraphUpdateReceived<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            graph = self.graph,
            nodes = self.nodes,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_update",
            span_name = name,
            node = self.node,
            graph = self.graph,
        )
    }
}

/// The control channel returned an error the listener survives.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct ControlReceiveFailed<'a> {
    pub node: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ControlReceiveFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: control channel error: {}", self.node, self.error)
    }
}

impl StructuredLog for ControlReceiveFailed<'_> {
    fn log(&self) {
        tracing::warn!(node = self.node, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "control_receive_failed",
            span_name = name,
            node = self.node,
            error = %self.error,
        )
    }
}
