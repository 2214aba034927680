// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Partition allocation
//! * Heartbeat-gated graph reconfiguration
//! * Graph execution faults
//! * Worker shutdown

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Worker allocated its partition and created its store slots.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerAllocated<'a> {
    pub node: &'a str,
    pub channels: usize,
}

impl Display for WorkerAllocated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: allocated partition with {} channels",
            self.node, self.channels
        )
    }
}

impl StructuredLog for WorkerAllocated<'_> {
    fn log(&self) {
        tracing::info!(node = self.node, channels = self.channels, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker",
            span_name = name,
            node = self.node,
            channels = self.channels,
        )
    }
}

/// A heartbeat found the reconfiguration flag raised.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ReconfigurationStarted<'a> {
    pub node: &'a str,
}

impl Display for ReconfigurationStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}: received new configuration", self.node)
    }
}

impl StructuredLog for ReconfigurationStarted<'_> {
    fn log(&self) {
        tracing::info!(node = self.node, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("reconfiguration", span_name = name, node = self.node)
    }
}

/// Pending configuration committed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use shardwood::observability::messages::worker::ConfigurationCompleted;
/// use std::time::Duration;
///
/// let msg = ConfigurationCompleted {
///     node: "worker003",
///     duration: Duration::from_millis(12),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ConfigurationCompleted<'a> {
    pub node: &'a str,
    pub duration: Duration,
}

impl Display for ConfigurationCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: configuration complete in {:?}",
            self.node, self.duration
        )
    }
}

impl StructuredLog for ConfigurationCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "configuration_completed",
            span_name = name,
            node = self.node,
            duration = ?self.duration,
        )
    }
}

/// Pending configuration rejected; the worker reverts.
///
/// # Log Level
/// `warn!` - Recovered fault
pub struct ConfigurationFailed<'a> {
    pub node: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ConfigurationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: configuration failed, reverting to previous config: {}",
            self.node, self.error
        )
    }
}

impl StructuredLog for ConfigurationFailed<'_> {
    fn log(&self) {
        tracing::warn!(node = self.node, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "configuration_failed",
            span_name = name,
            node = self.node,
            error = %self.error,
        )
    }
}

/// Graph execution fault. The worker terminates.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct GraphExecutionFailed<'a> {
    pub node: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for GraphExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: failure encountered executing graph: {}",
            self.node, self.error
        )
    }
}

impl StructuredLog for GraphExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(node = self.node, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "graph_execution_failed",
            span_name = name,
            node = self.node,
            error = %self.error,
        )
    }
}

/// Worker drained its source.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkerFinished<'a> {
    pub node: &'a str,
    pub events: u64,
    pub reconfigurations: u64,
}

impl Display for WorkerFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}: source exhausted after {} events ({} reconfigurations)",
            self.node, self.events, self.reconfigurations
        )
    }
}

impl StructuredLog for WorkerFinished<'_> {
    fn log(&self) {
        tracing::info!(
            node = self.node,
            events = self.events,
            reconfigurations = self.reconfigurations,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "worker_finished",
            span_name = name,
            node = self.node,
            events = self.events,
        )
    }
}
