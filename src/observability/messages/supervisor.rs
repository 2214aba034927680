// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the supervising process.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A child (process or rank) finished.
///
/// # Log Level
/// `info!` on success, `error!` otherwise
///
/// # Example
/// ```
/// use shardwood::observability::messages::supervisor::ChildExited;
///
/// let msg = ChildExited { name: "worker001-n001", code: Some(1) };
/// assert_eq!(msg.to_string(), "worker001-n001 exited with non-zero status code: 1");
/// ```
pub struct ChildExited<'a> {
    pub name: &'a str,
    /// `None` when the child was killed by a signal
    pub code: Option<i32>,
}

impl ChildExited<'_> {
    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }
}

impl Display for ChildExited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.code {
            Some(0) => write!(f, "{} exited successfully", self.name),
            Some(code) => write!(f, "{} exited with non-zero status code: {}", self.name, code),
            None => write!(f, "{} was terminated by a signal", self.name),
        }
    }
}

impl StructuredLog for ChildExited<'_> {
    fn log(&self) {
        if self.succeeded() {
            tracing::info!(child = self.name, code = self.code, "{}", self);
        } else {
            tracing::error!(child = self.name, code = self.code, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("child_exited", span_name = name, child = self.name)
    }
}
