// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors surfaced by a [`crate::traits::Graph`].
//!
//! The variants map onto the three outcomes the worker distinguishes:
//! configuration faults are recoverable by reverting, runtime faults are fatal
//! for the worker, and a revert with nothing to revert to is fatal too.

use crate::errors::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph configuration failed: {reason}")]
    Config {
        reason: String,
        validation: Vec<ValidationError>,
    },

    #[error("graph execution failed in node '{node_id}': {reason}")]
    Runtime { node_id: String, reason: String },

    #[error("no committed graph configuration to revert to")]
    NoCommittedConfig,
}

impl GraphError {
    pub fn config(reason: impl Into<String>) -> Self {
        GraphError::Config {
            reason: reason.into(),
            validation: Vec::new(),
        }
    }

    pub fn runtime(node_id: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::Runtime {
            node_id: node_id.into(),
            reason: reason.into(),
        }
    }
}

impl From<Vec<ValidationError>> for GraphError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let reason = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        GraphError::Config {
            reason,
            validation: errors,
        }
    }
}
