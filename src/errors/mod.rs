// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod node;
mod store;
mod transport;

pub use config::{ConfigError, ValidationError};
pub use graph::GraphError;
pub use node::{CollectorError, RunError, SourceError, WorkerError};
pub use store::StoreError;
pub use transport::{TransportError, WireError};
