// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fatal faults of worker and collector processes. Every variant maps to a
//! non-zero process exit.

use std::time::Duration;

use crate::errors::{ConfigError, GraphError, StoreError, TransportError};
use crate::message::MessageKind;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("allocation failed: {0}")]
    Allocate(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("graph execution fault: {0}")]
    GraphRuntime(#[source] GraphError),

    #[error("reverting graph configuration failed: {0}")]
    RevertFailed(#[source] GraphError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{kind} barrier stalled for {waited:?}: {received} of {expected} workers reported")]
    BarrierTimeout {
        kind: MessageKind,
        received: usize,
        expected: usize,
        waited: Duration,
    },
}

/// Faults of a whole node run: startup, one role, or child supervision.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error("could not launch {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
