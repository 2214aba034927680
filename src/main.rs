// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! `shardwood` - run one node of the monitoring pipeline.
//!
//! Usage:
//!   shardwood run [SOURCE] [--collective] [node options]
//!   shardwood worker --id N [node options]
//!   shardwood collector [node options]
//!
//! `run` supervises a whole node; `worker` and `collector` are what the
//! supervisor launches as child processes on the socket backend.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use shardwood::config::{load_config, Backend, Config};
use shardwood::engine::{run_collector, run_worker, Supervisor};
use shardwood::observability::init_tracing;

#[derive(Parser)]
#[command(name = "shardwood")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch and supervise the workers and the collector of this node
    Run {
        /// Data source, e.g. static://configs/static.json
        #[arg(value_name = "SOURCE")]
        data_source: Option<String>,

        /// Run every role as a task over an in-process communicator
        #[arg(long)]
        collective: bool,

        #[command(flatten)]
        node: NodeArgs,
    },
    /// Run a single worker
    Worker {
        /// Worker number within this node
        #[arg(long)]
        id: u32,

        #[command(flatten)]
        node: NodeArgs,
    },
    /// Run this node's collector
    Collector {
        #[command(flatten)]
        node: NodeArgs,
    },
}

/// Options shared by every role. Flags override the config file.
#[derive(Args, Clone, Debug)]
struct NodeArgs {
    /// YAML node configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Manager host name
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Platform number, selects the port block
    #[arg(short, long)]
    platform: Option<u16>,

    /// Number of workers on this node
    #[arg(short = 'n', long)]
    num_workers: Option<usize>,

    /// Node number used in worker and collector names
    #[arg(short = 'N', long)]
    node_num: Option<u32>,

    /// Data source, e.g. static://configs/static.json
    #[arg(long)]
    source: Option<String>,

    /// Initial graph configuration (YAML)
    #[arg(long)]
    graph: Option<PathBuf>,
}

impl NodeArgs {
    fn resolve(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load node config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(host) = &self.host {
            cfg.host = host.clone();
        }
        if let Some(platform) = self.platform {
            cfg.platform = platform;
        }
        if let Some(num_workers) = self.num_workers {
            cfg.num_workers = num_workers;
        }
        if let Some(node_num) = self.node_num {
            cfg.node_num = node_num;
        }
        if let Some(source) = &self.source {
            cfg.source = Some(source.clone());
        }
        if let Some(graph) = &self.graph {
            cfg.graph = Some(graph.clone());
        }

        cfg.validate().context("invalid node configuration")?;
        Ok(cfg)
    }
}

async fn execute(command: Command) -> Result<ExitCode> {
    match command {
        Command::Run {
            data_source,
            collective,
            node,
        } => {
            let mut cfg = node.resolve()?;
            if data_source.is_some() {
                cfg.source = data_source;
            }
            if collective {
                cfg.backend = Backend::Collective;
            }

            let report = Supervisor::new(cfg, node.config.clone())
                .run()
                .await
                .context("node failed to start")?;
            tracing::info!(
                succeeded = report.succeeded.len(),
                failed = report.failed.len(),
                terminated = report.terminated,
                "node finished"
            );
            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Worker { id, node } => {
            let cfg = node.resolve()?;
            run_worker(&cfg, id)
                .await
                .with_context(|| format!("worker {} failed", id))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Collector { node } => {
            let cfg = node.resolve()?;
            run_collector(&cfg).await.context("collector failed")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    tokio::select! {
        result = execute(cli.command) => match result {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "fatal fault");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            ExitCode::SUCCESS
        }
    }
}
