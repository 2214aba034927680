// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;

use crate::errors::GraphError;

/// Errors that can occur during graph configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular reference was detected between graph nodes
    CyclicDependency {
        /// The cycle path showing the circular reference
        cycle: Vec<String>,
    },
    /// Two nodes share the same id
    DuplicateNodeId {
        node_id: String,
    },
    /// A node declares no inputs
    MissingInputs {
        node_id: String,
    },
    /// A node's operator parameters are unusable
    InvalidParameter {
        node_id: String,
        reason: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::DuplicateNodeId { node_id } => {
                write!(f, "Duplicate node ID: '{}'", node_id)
            }
            ValidationError::MissingInputs { node_id } => {
                write!(f, "Node '{}' declares no inputs", node_id)
            }
            ValidationError::InvalidParameter { node_id, reason } => {
                write!(f, "Node '{}' has an invalid parameter: {}", node_id, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Startup configuration faults. All of them are fatal for the process.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("problem opening config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("problem parsing yaml file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("problem parsing json file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid data source config string: '{0}'")]
    InvalidSourceSpec(String),

    #[error("invalid data source config {path}: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("unknown data source type: '{0}'")]
    UnknownSourceType(String),

    #[error("platform {platform} is out of range (maximum {max})")]
    PlatformOutOfRange { platform: u16, max: u16 },

    #[error("num_workers must be at least 1")]
    NoWorkers,

    #[error("graph configuration validation failed:\n{}", format_validation(.0))]
    InvalidGraph(Vec<ValidationError>),

    #[error("initial graph configuration rejected: {0}")]
    Graph(#[from] GraphError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
