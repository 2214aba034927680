// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_CONNECT_RETRIES, DEFAULT_HOST, DEFAULT_RETRY_INTERVAL_MS};
use crate::config::ports::Ports;
use crate::config::validate_graph_config;
use crate::errors::ConfigError;
use crate::graph::GraphConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Deployment configuration for one node (one collector and its workers).
///
/// Every field is optional in the YAML file; command line flags override
/// whatever the file sets.
///
/// # Example
/// ```yaml
/// platform: 2
/// host: daq-mgr01
/// num_workers: 4
/// node_num: 1
/// backend: socket
/// source: static://configs/static.json
/// graph: configs/graph.yaml
/// collector:
///   barrier_timeout_ms: 30000
///   upstream: push
/// connect:
///   retries: 20
///   retry_interval_ms: 250
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default = "default_node_num")]
    pub node_num: u32,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub graph: Option<PathBuf>,
    #[serde(default)]
    pub collector: CollectorOptions,
    #[serde(default)]
    pub connect: ConnectOptions,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_num_workers() -> usize {
    1
}

fn default_node_num() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform: 0,
            host: default_host(),
            num_workers: default_num_workers(),
            node_num: default_node_num(),
            backend: Backend::default(),
            source: None,
            graph: None,
            collector: CollectorOptions::default(),
            connect: ConnectOptions::default(),
        }
    }
}

impl Config {
    pub fn ports(&self) -> Result<Ports, ConfigError> {
        Ports::new(self.platform)
    }

    /// Source spec string, failing if none was configured.
    pub fn source_spec(&self) -> Result<SourceSpec, ConfigError> {
        let raw = self
            .source
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidSourceSpec(String::new()))?;
        SourceSpec::parse(raw)
    }

    /// Checks that do not need any file or network access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ports()?;
        if self.num_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if let Some(raw) = &self.source {
            SourceSpec::parse(raw)?;
        }
        Ok(())
    }
}

/// Which transport carries worker → collector traffic.
///
/// # Variants
/// * `Socket` - TCP push/pull/sub sockets, one process per worker and collector
/// * `Collective` - rank-addressed in-process communicator, rank 0 collects
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    Socket,
    Collective,
}

/// Collector behaviour.
///
/// # Fields
/// * `barrier_timeout_ms` - Fail a partially filled barrier round after this
///   long without a message. Unset means wait forever.
/// * `upstream` - Where aggregated messages go
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectorOptions {
    pub barrier_timeout_ms: Option<u64>,
    #[serde(default)]
    pub upstream: UpstreamSink,
}

/// Destination of a collector's aggregated output.
///
/// # Variants
/// * `Push` - push socket to the final collector on `host`
/// * `Log` - log every message; for nodes running without a final collector
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamSink {
    #[default]
    Push,
    Log,
}

impl CollectorOptions {
    pub fn barrier_timeout(&self) -> Option<Duration> {
        self.barrier_timeout_ms.map(Duration::from_millis)
    }
}

/// Reconnect behaviour for connecting sockets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectOptions {
    pub retries: Option<u32>,
    pub retry_interval_ms: Option<u64>,
}

impl ConnectOptions {
    pub fn get_retries(&self) -> u32 {
        self.retries.unwrap_or(DEFAULT_CONNECT_RETRIES).max(1)
    }

    pub fn get_retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.unwrap_or(DEFAULT_RETRY_INTERVAL_MS))
    }
}

/// Parsed `protocol://body` data source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub protocol: String,
    pub body: String,
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.split_once("://") {
            Some((protocol, body)) if !protocol.is_empty() => Ok(Self {
                protocol: protocol.to_string(),
                body: body.to_string(),
            }),
            _ => Err(ConfigError::InvalidSourceSpec(raw.to_string())),
        }
    }
}

/// Load a node config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a graph configuration from YAML and validate it.
pub fn load_graph_config<P: AsRef<Path>>(path: P) -> Result<GraphConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: GraphConfig = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    validate_graph_config(&cfg).map_err(ConfigError::InvalidGraph)?;
    Ok(cfg)
}
