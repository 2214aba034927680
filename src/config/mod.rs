// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod runtime;
mod validation;

pub mod consts;
pub mod ports;

pub use loader::{
    load_config, load_graph_config, Backend, CollectorOptions, Config, ConnectOptions,
    SourceSpec, UpstreamSink,
};
pub use ports::{PortRole, Ports};
pub use runtime::{CollectiveLinks, CollectorLinks, RuntimeBuilder, TransportFactory, WorkerLinks};
pub use validation::validate_graph_config;
