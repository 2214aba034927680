// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Deployment-wide port allocation.
//!
//! Each platform number owns a disjoint block of `PORTS_PER_PLATFORM` ports
//! starting at `BASE_PORT + platform * PORTS_PER_PLATFORM`, so several
//! independent deployments can share hosts without colliding.

use crate::config::consts::{BASE_PORT, MAX_PLATFORM, PORTS_PER_PLATFORM};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortRole {
    /// Collector → final aggregator push
    FinalCollector,
    /// Worker → collector push / collector inbound pull
    Collector,
    /// Manager → worker graph broadcast
    Graph,
}

impl PortRole {
    fn offset(self) -> u16 {
        match self {
            PortRole::FinalCollector => 0,
            PortRole::Collector => 1,
            PortRole::Graph => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    platform: u16,
}

impl Ports {
    pub fn new(platform: u16) -> Result<Self, ConfigError> {
        if platform > MAX_PLATFORM {
            return Err(ConfigError::PlatformOutOfRange {
                platform,
                max: MAX_PLATFORM,
            });
        }
        Ok(Self { platform })
    }

    pub fn port(&self, role: PortRole) -> u16 {
        BASE_PORT + self.platform * PORTS_PER_PLATFORM + role.offset()
    }

    /// `host:port` for a role, for connecting sockets.
    pub fn connect_addr(&self, host: &str, role: PortRole) -> String {
        format!("{}:{}", host, self.port(role))
    }

    /// Wildcard address for binding sockets.
    pub fn bind_addr(&self, role: PortRole) -> String {
        format!("0.0.0.0:{}", self.port(role))
    }
}
