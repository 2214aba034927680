// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concrete implementations of the transport, source and graph seams.
//!
//! # Available Backends
//!
//! ## Socket Transport
//! TCP push/pull pipelines plus a pub/sub control channel:
//! - **Push / Pull**: worker → collector and collector → final collector
//! - **Publisher / Sub**: graph updates broadcast to every worker
//! - **Use Case**: one OS process per worker and collector
//!
//! ## Collective Transport
//! Rank-addressed communicator inside one process:
//! - **Rank 0**: collector
//! - **Ranks 1..N**: workers
//! - **Use Case**: single-process runs and tests
//!
//! ## Static Source
//! Synthetic events from a JSON description (`static://file.json`).
//!
//! ## Local Graph
//! Small reference graph (sum, latest, scale, count) so a worker has
//! something to drive without an operator library.
//!
//! ## Stub Backend (Test-Only)
//! Recording senders, scripted sources and control channels, and a mock graph.
//! **Note**: NOT available in production builds
//!
//! # Architecture
//!
//! ```text
//! Config → RuntimeBuilder → TransportFactory → Sender / Receiver / Control
//! ```

pub mod collective;
pub mod local;
pub mod log_sink;
pub mod socket;
pub mod static_source;
#[cfg(test)]
pub mod stub;
