// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Worker and collector main loops, the graph update listener and the node
//! supervisor.

pub mod collector;
pub mod listener;
pub mod supervisor;
pub mod worker;

pub use collector::{Barrier, Collector, CollectorStep};
pub use listener::{Listener, ReconfigureFlag};
pub use supervisor::{collector_name, run_collector, run_worker, worker_name, RunReport, Supervisor};
pub use worker::{Worker, WorkerState};
