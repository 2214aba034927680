// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::collective::{Broadcaster, World};
use crate::backends::local::LocalGraph;
use crate::backends::log_sink::LogSink;
use crate::backends::socket::{PullSocket, PushSocket, SubSocket};
use crate::backends::static_source::{StaticSource, StaticSourceConfig};
use crate::config::consts::GRAPH_TOPIC;
use crate::config::loader::{load_graph_config, Config, SourceSpec, UpstreamSink};
use crate::config::ports::PortRole;
use crate::errors::{ConfigError, RunError, TransportError};
use crate::traits::{ControlChannel, Graph, MessageReceiver, MessageSender, Source};

/// Worker → collector link plus the control channel feeding the listener.
pub struct WorkerLinks {
    pub sender: Box<dyn MessageSender>,
    pub control: Box<dyn ControlChannel>,
}

/// Collector inbound link plus its upstream sender.
pub struct CollectorLinks {
    pub receiver: Box<dyn MessageReceiver>,
    pub upstream: Box<dyn MessageSender>,
}

/// Every link of a collective run. Index `i` of `workers` is rank `i + 1`.
pub struct CollectiveLinks {
    pub collector: CollectorLinks,
    pub workers: Vec<WorkerLinks>,
    pub broadcaster: Broadcaster,
}

/// Builds transports for the configured backend.
///
/// The backend is chosen once, here, from [`crate::config::Backend`]; nothing
/// downstream inspects which transport it was handed.
pub struct TransportFactory;

impl TransportFactory {
    /// Socket links of one worker process: push to the local collector,
    /// subscribe to graph updates on the manager host.
    pub async fn socket_worker(cfg: &Config) -> Result<WorkerLinks, RunError> {
        let ports = cfg.ports()?;
        let collector_addr = ports.connect_addr("localhost", PortRole::Collector);
        let graph_addr = ports.connect_addr(&cfg.host, PortRole::Graph);

        let sender = PushSocket::connect(&collector_addr, &cfg.connect).await?;
        let control = SubSocket::connect(&graph_addr, GRAPH_TOPIC, &cfg.connect);
        Ok(WorkerLinks {
            sender: Box::new(sender),
            control: Box::new(control),
        })
    }

    /// Socket links of the collector process: bind the collector port on all
    /// interfaces and open the upstream sink.
    pub async fn socket_collector(cfg: &Config) -> Result<CollectorLinks, RunError> {
        let ports = cfg.ports()?;
        let receiver = PullSocket::bind(&ports.bind_addr(PortRole::Collector)).await?;
        let upstream = Self::upstream(cfg).await?;
        Ok(CollectorLinks {
            receiver: Box::new(receiver),
            upstream,
        })
    }

    /// A world of `num_workers + 1` ranks, rank 0 collecting.
    pub async fn collective(cfg: &Config) -> Result<CollectiveLinks, RunError> {
        let (communicators, broadcaster) = World::new(cfg.num_workers + 1).into_parts();
        let mut ranks = communicators.into_iter();
        let rank0 = ranks.next().ok_or(TransportError::InvalidRank { rank: 0, size: 0 })?;

        let workers = ranks
            .map(|comm| WorkerLinks {
                control: Box::new(comm.control()),
                sender: Box::new(comm),
            })
            .collect();

        Ok(CollectiveLinks {
            collector: CollectorLinks {
                receiver: Box::new(rank0),
                upstream: Self::upstream(cfg).await?,
            },
            workers,
            broadcaster,
        })
    }

    pub async fn upstream(cfg: &Config) -> Result<Box<dyn MessageSender>, RunError> {
        match cfg.collector.upstream {
            UpstreamSink::Log => Ok(Box::new(LogSink::new(format!(
                "final-collector-n{:03}",
                cfg.node_num
            )))),
            UpstreamSink::Push => {
                let ports = cfg.ports()?;
                let addr = ports.connect_addr(&cfg.host, PortRole::FinalCollector);
                Ok(Box::new(PushSocket::connect(&addr, &cfg.connect).await?))
            }
        }
    }
}

/// Runtime builder - creates the data source and graph a worker drives.
///
/// # Examples
///
/// ```
/// use shardwood::config::{RuntimeBuilder, SourceSpec};
/// use shardwood::errors::ConfigError;
///
/// let spec = SourceSpec::parse("psana://exp=xcsdaq13:run=14").unwrap();
/// let result = RuntimeBuilder::open_source(&spec, 0);
/// assert!(matches!(result, Err(ConfigError::UnknownSourceType(_))));
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Open the data source named by `spec` for worker `idnum`.
    ///
    /// Only `static://` is available in-process; any other protocol is a
    /// startup fault.
    pub fn open_source(spec: &SourceSpec, idnum: u32) -> Result<Box<dyn Source>, ConfigError> {
        match spec.protocol.as_str() {
            "static" => {
                let cfg = StaticSourceConfig::load(&spec.body)?;
                Ok(Box::new(StaticSource::new(idnum, cfg)))
            }
            other => Err(ConfigError::UnknownSourceType(other.to_string())),
        }
    }

    /// A fresh graph for worker `name`, with the configured initial graph
    /// committed if one is set.
    pub fn build_graph(name: &str, cfg: &Config) -> Result<Arc<LocalGraph>, ConfigError> {
        let graph = Arc::new(LocalGraph::new(name));
        if let Some(path) = &cfg.graph {
            graph.update(load_graph_config(path)?);
            graph.configure()?;
        }
        Ok(graph)
    }
}
