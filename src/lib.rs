// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;      // transports, sources, local graph
pub mod config;        // node config, ports, runtime wiring
pub mod engine;        // worker, collector, listener, supervisor
pub mod errors;        // error handling
pub mod graph;         // graph configuration model
pub mod message;       // message model
pub mod observability;
pub mod store;         // result store
pub mod traits;        // transport / source / graph seams
