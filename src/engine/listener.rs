// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Background reception of graph updates.
//!
//! The listener is the only task besides a worker's main loop. The two share
//! exactly two things: the graph's pending slot (written through the
//! callback) and a [`ReconfigureFlag`]. The callback always runs before the
//! flag is raised, so a main loop that observes the flag is guaranteed to
//! find the update staged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::errors::TransportError;
use crate::graph::GraphConfig;
use crate::observability::messages::transport::{ControlReceiveFailed, GraphUpdateReceived};
use crate::observability::messages::StructuredLog;
use crate::traits::ControlChannel;

/// Single-writer, single-reader "new configuration staged" signal.
///
/// # Examples
/// ```
/// use shardwood::engine::ReconfigureFlag;
///
/// let flag = ReconfigureFlag::new();
/// flag.raise();
/// assert!(flag.take());
/// assert!(!flag.take());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReconfigureFlag(Arc<AtomicBool>);

impl ReconfigureFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read and clear in one atomic step. Two raises between takes collapse
    /// into one `true`.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct Listener {
    handle: JoinHandle<u64>,
    token: CancellationToken,
}

impl Listener {
    /// Spawn the listener task.
    ///
    /// `callback` runs on the listener task for every update and must only
    /// stage the configuration (e.g. [`crate::traits::Graph::update`]). The
    /// task ends when `token` is cancelled or the channel reports
    /// [`TransportError::Closed`]; any other receive error is logged and
    /// reception continues.
    pub fn spawn<F>(
        name: impl Into<String>,
        mut control: Box<dyn ControlChannel>,
        callback: F,
        flag: ReconfigureFlag,
        token: CancellationToken,
    ) -> Self
    where
        F: Fn(GraphConfig) + Send + 'static,
    {
        let name = name.into();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            let mut received = 0u64;
            loop {
                let update = tokio::select! {
                    _ = task_token.cancelled() => break,
                    update = control.next_update() => update,
                };
                match update {
                    Ok(config) => {
                        GraphUpdateReceived {
                            node: &name,
                            graph: config.label(),
                            nodes: config.nodes.len(),
                        }
                        .log();
                        callback(config);
                        flag.raise();
                        received += 1;
                    }
                    Err(TransportError::Closed) => {
                        tracing::debug!(node = %name, "control channel closed, listener stopping");
                        break;
                    }
                    Err(e) => ControlReceiveFailed {
                        node: &name,
                        error: &e,
                    }
                    .log(),
                }
            }
            received
        });

        Self { handle, token }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Stop the task and wait for it. Returns the number of updates staged.
    pub async fn shutdown(self) -> u64 {
        self.token.cancel();
        match self.handle.await {
            Ok(received) => received,
            Err(e) => {
                tracing::warn!(error = %e, "listener task did not finish cleanly");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{MockGraph, ScriptedControl};
    use crate::traits::Graph;
    use std::time::Duration;

    fn named(name: &str) -> GraphConfig {
        GraphConfig {
            name: Some(name.to_string()),
            nodes: Vec::new(),
        }
    }

    async fn wait_until(check: impl Fn() -> bool) {
        for _ in 0..500 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition never became true");
    }

    #[test]
    fn test_flag_take_clears() {
        let flag = ReconfigureFlag::new();
        assert!(!flag.take());
        flag.raise();
        flag.raise();
        assert!(flag.is_raised());
        assert!(flag.take());
        assert!(!flag.is_raised());
        assert!(!flag.take());
    }

    #[tokio::test]
    async fn test_update_is_staged_before_flag_is_raised() {
        let graph = Arc::new(MockGraph::new());
        let flag = ReconfigureFlag::new();
        let (tx, control) = ScriptedControl::new();

        let staged = Arc::clone(&graph);
        let listener = Listener::spawn(
            "worker000",
            Box::new(control),
            move |cfg| staged.update(cfg),
            flag.clone(),
            CancellationToken::new(),
        );

        tx.send(Ok(named("v2"))).unwrap();
        wait_until(|| flag.is_raised()).await;
        assert_eq!(graph.pending().and_then(|c| c.name), Some("v2".to_string()));

        drop(tx);
        assert_eq!(listener.shutdown().await, 1);
    }

    #[tokio::test]
    async fn test_listener_survives_receive_errors() {
        let graph = Arc::new(MockGraph::new());
        let flag = ReconfigureFlag::new();
        let (tx, control) = ScriptedControl::new();

        let staged = Arc::clone(&graph);
        let listener = Listener::spawn(
            "worker000",
            Box::new(control),
            move |cfg| staged.update(cfg),
            flag.clone(),
            CancellationToken::new(),
        );

        tx.send(Err(TransportError::Lagged(3))).unwrap();
        tx.send(Ok(named("after-error"))).unwrap();
        wait_until(|| flag.is_raised()).await;
        assert_eq!(graph.update_calls(), 1);

        drop(tx);
        wait_until(|| listener.is_finished()).await;
    }

    #[tokio::test]
    async fn test_cancellation_stops_listener() {
        let (_tx, control) = ScriptedControl::new();
        let token = CancellationToken::new();
        let listener = Listener::spawn(
            "worker000",
            Box::new(control),
            |_| {},
            ReconfigureFlag::new(),
            token.clone(),
        );
        token.cancel();
        wait_until(|| listener.is_finished()).await;
        assert_eq!(listener.shutdown().await, 0);
    }
}
