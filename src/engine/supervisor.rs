// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Launches and supervises the workers and the collector of one node.
//!
//! - **Socket backend**: one child process per worker plus one collector
//!   process, all running this executable with the `worker` / `collector`
//!   subcommands.
//! - **Collective backend**: rank 0 (collector) and ranks `1..=N` (workers)
//!   as tasks over one in-process world.
//!
//! Children are never restarted. The first failure terminates the rest,
//! since a collector waiting on a dead worker could never complete its round.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::task::JoinSet;

use crate::backends::local::LocalGraph;
use crate::config::{
    Backend, CollectiveLinks, CollectorLinks, Config, RuntimeBuilder, TransportFactory,
    WorkerLinks,
};
use crate::engine::collector::Collector;
use crate::engine::worker::Worker;
use crate::errors::RunError;
use crate::observability::messages::supervisor::ChildExited;
use crate::observability::messages::StructuredLog;
use crate::traits::Source;

pub fn worker_name(idnum: u32, node_num: u32) -> String {
    format!("worker{:03}-n{:03}", idnum, node_num)
}

pub fn collector_name(node_num: u32) -> String {
    format!("collector-n{:03}", node_num)
}

/// Body of the `worker` subcommand.
pub async fn run_worker(cfg: &Config, idnum: u32) -> Result<(), RunError> {
    let name = worker_name(idnum, cfg.node_num);
    let source = RuntimeBuilder::open_source(&cfg.source_spec()?, idnum)?;
    let graph = RuntimeBuilder::build_graph(&name, cfg)?;
    let links = TransportFactory::socket_worker(cfg).await?;
    drive_worker(name, source, graph, links).await
}

/// Body of the `collector` subcommand.
pub async fn run_collector(cfg: &Config) -> Result<(), RunError> {
    let links = TransportFactory::socket_collector(cfg).await?;
    drive_collector(collector_name(cfg.node_num), cfg, links).await
}

async fn drive_worker(
    name: String,
    source: Box<dyn Source>,
    graph: Arc<LocalGraph>,
    links: WorkerLinks,
) -> Result<(), RunError> {
    let mut worker = Worker::new(name, source, links.sender, graph);
    worker.run_with_control(links.control).await?;
    Ok(())
}

async fn drive_collector(name: String, cfg: &Config, links: CollectorLinks) -> Result<(), RunError> {
    let mut collector = Collector::new(name, cfg.num_workers, links.receiver, links.upstream)
        .with_barrier_timeout(cfg.collector.barrier_timeout());
    collector.run().await?;
    Ok(())
}

/// Outcome of a supervised run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Children stopped by the supervisor after another one failed.
    pub terminated: usize,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.terminated == 0
    }
}

pub struct Supervisor {
    cfg: Config,
    config_path: Option<PathBuf>,
}

impl Supervisor {
    /// `config_path` is handed to child processes so they read the same file.
    pub fn new(cfg: Config, config_path: Option<PathBuf>) -> Self {
        Self { cfg, config_path }
    }

    pub async fn run(&self) -> Result<RunReport, RunError> {
        self.cfg.validate()?;
        self.cfg.source_spec()?;
        match self.cfg.backend {
            Backend::Socket => self.run_processes().await,
            Backend::Collective => self.run_collective().await,
        }
    }

    async fn run_processes(&self) -> Result<RunReport, RunError> {
        let exe = std::env::current_exe().map_err(|source| RunError::Spawn {
            name: "current executable".to_string(),
            source,
        })?;
        let node = self.cfg.node_num;
        let mut children = JoinSet::new();

        for idnum in 0..self.cfg.num_workers as u32 {
            let name = worker_name(idnum, node);
            let mut cmd = self.child_command(&exe, "worker");
            cmd.arg("--id").arg(idnum.to_string());
            let child = spawn(&name, cmd)?;
            children.spawn(wait_child(name, child));
        }

        let name = collector_name(node);
        let child = spawn(&name, self.child_command(&exe, "collector"))?;
        children.spawn(wait_child(name, child));

        Ok(supervise(children).await)
    }

    async fn run_collective(&self) -> Result<RunReport, RunError> {
        let spec = self.cfg.source_spec()?;
        let node = self.cfg.node_num;
        let CollectiveLinks {
            collector,
            workers,
            broadcaster,
        } = TransportFactory::collective(&self.cfg).await?;

        let mut tasks = JoinSet::new();
        for (idnum, links) in (0u32..).zip(workers) {
            let name = worker_name(idnum, node);
            let source = RuntimeBuilder::open_source(&spec, idnum)?;
            let graph = RuntimeBuilder::build_graph(&name, &self.cfg)?;
            tasks.spawn(async move {
                let result = drive_worker(name.clone(), source, graph, links).await;
                let code = exit_code(&name, result);
                (name, code)
            });
        }

        let cfg = self.cfg.clone();
        let name = collector_name(node);
        tasks.spawn(async move {
            let result = drive_collector(name.clone(), &cfg, collector).await;
            let code = exit_code(&name, result);
            (name, code)
        });

        let report = supervise(tasks).await;
        drop(broadcaster);
        Ok(report)
    }

    fn child_command(&self, exe: &Path, role: &str) -> Command {
        let mut cmd = Command::new(exe);
        cmd.arg(role);
        if let Some(path) = &self.config_path {
            cmd.arg("--config").arg(path);
        }
        cmd.arg("--platform")
            .arg(self.cfg.platform.to_string())
            .arg("--host")
            .arg(&self.cfg.host)
            .arg("--num-workers")
            .arg(self.cfg.num_workers.to_string())
            .arg("--node-num")
            .arg(self.cfg.node_num.to_string());
        if let Some(source) = &self.cfg.source {
            cmd.arg("--source").arg(source);
        }
        if let Some(graph) = &self.cfg.graph {
            cmd.arg("--graph").arg(graph);
        }
        cmd.kill_on_drop(true);
        cmd
    }
}

fn spawn(name: &str, mut cmd: Command) -> Result<Child, RunError> {
    cmd.spawn().map_err(|source| RunError::Spawn {
        name: name.to_string(),
        source,
    })
}

async fn wait_child(name: String, mut child: Child) -> (String, Option<i32>) {
    match child.wait().await {
        Ok(status) => (name, status.code()),
        Err(e) => {
            tracing::error!(child = %name, error = %e, "lost track of child process");
            (name, None)
        }
    }
}

fn exit_code(name: &str, result: Result<(), RunError>) -> Option<i32> {
    match result {
        Ok(()) => Some(0),
        Err(e) => {
            tracing::error!(node = name, error = %e, "fatal fault");
            Some(1)
        }
    }
}

async fn supervise(mut children: JoinSet<(String, Option<i32>)>) -> RunReport {
    let mut report = RunReport::default();

    while let Some(joined) = children.join_next().await {
        let (name, code) = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => {
                report.terminated += 1;
                continue;
            }
            Err(e) => (format!("supervised task ({})", e), None),
        };

        let exited = ChildExited { name: &name, code };
        exited.log();
        if exited.succeeded() {
            report.succeeded.push(name);
            continue;
        }

        report.failed.push(name);
        if !children.is_empty() {
            tracing::warn!(remaining = children.len(), "terminating remaining children");
            children.abort_all();
        }
    }

    report
}
