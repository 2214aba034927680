// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Synthetic event source driven by a JSON file (`static://path.json`).
//!
//! # Example
//! ```json
//! {
//!   "interval": 0.01,
//!   "heartbeat": 10,
//!   "init_time": 0.5,
//!   "count": 100,
//!   "config": {
//!     "det1": { "dtype": "f64", "value": 1.0 },
//!     "trace": { "dtype": "waveform", "value": [0.0, 0.5, 1.0] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::errors::{ConfigError, SourceError};
use crate::message::{DType, Datagram, Message, Occurrence, Partition, Value};
use crate::traits::Source;

#[derive(Debug, Clone, Deserialize)]
pub struct StaticSourceConfig {
    /// Seconds between two events.
    pub interval: f64,
    /// Events per heartbeat.
    pub heartbeat: u64,
    /// Seconds to wait before the first event.
    #[serde(default)]
    pub init_time: f64,
    /// Stop after this many events. Unset runs forever.
    #[serde(default)]
    pub count: Option<u64>,
    /// Channels in name order.
    pub config: BTreeMap<String, ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub dtype: DType,
    pub value: Value,
}

impl StaticSourceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate().map_err(|reason| ConfigError::InvalidSource {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), String> {
        if self.heartbeat == 0 {
            return Err("heartbeat must be at least 1".to_string());
        }
        for (label, secs) in [("interval", self.interval), ("init_time", self.init_time)] {
            seconds(label, secs)?;
        }
        for (name, channel) in &self.config {
            if !channel.dtype.accepts(&channel.value) {
                return Err(format!(
                    "channel '{}' declares {} but its value is {}",
                    name,
                    channel.dtype,
                    channel.value.dtype()
                ));
            }
        }
        Ok(())
    }
}

/// A wait in seconds as a [`Duration`]. Fails for anything `Duration` cannot hold.
fn seconds(label: &str, secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("{} must be a non-negative number of seconds ({})", label, e))
}

pub struct StaticSource {
    idnum: u32,
    cfg: StaticSourceConfig,
    emitted: u64,
    started: bool,
    heartbeat_due: bool,
    finished: bool,
}

impl StaticSource {
    pub fn new(idnum: u32, cfg: StaticSourceConfig) -> Self {
        Self {
            idnum,
            cfg,
            emitted: 0,
            started: false,
            heartbeat_due: false,
            finished: false,
        }
    }

    fn batch(&self) -> Message {
        Message::Datagram(
            self.cfg
                .config
                .iter()
                .map(|(name, channel)| Datagram::new(name.clone(), channel.value.clone()))
                .collect(),
        )
    }
}

#[async_trait]
impl Source for StaticSource {
    fn partition(&self) -> Partition {
        self.cfg
            .config
            .iter()
            .map(|(name, channel)| (name.clone(), channel.dtype))
            .collect::<Vec<_>>()
            .into()
    }

    async fn next_event(&mut self) -> Result<Option<Message>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        if self.heartbeat_due {
            self.heartbeat_due = false;
            return Ok(Some(Message::heartbeat()));
        }
        if self.cfg.count.is_some_and(|count| self.emitted >= count) {
            self.finished = true;
            tracing::debug!(source = self.idnum, events = self.emitted, "static source exhausted");
            return Ok(Some(Message::Occurrence(Occurrence::EndOfData)));
        }

        let (label, secs) = if self.started {
            ("interval", self.cfg.interval)
        } else {
            self.started = true;
            ("init_time", self.cfg.init_time)
        };
        let wait = seconds(label, secs).map_err(SourceError::Unavailable)?;
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        self.emitted += 1;
        self.heartbeat_due = self.emitted % self.cfg.heartbeat == 0;
        Ok(Some(self.batch()))
    }
}
