// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Test doubles for the transport, source and graph seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::{GraphError, SourceError, TransportError};
use crate::graph::GraphConfig;
use crate::message::{Message, Partition};
use crate::store::ResultStore;
use crate::traits::{ControlChannel, Graph, MessageReceiver, MessageSender, Source};

/// Sender that records everything it is asked to send. Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingSender {
    sent: Arc<Mutex<Vec<Message>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    /// Make every further `send` fail with [`TransportError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(msg);
        Ok(())
    }
}

/// Receiver fed by the test through an unbounded channel. Dropping the
/// returned sender closes it.
pub struct ChannelReceiver {
    rx: mpsc::UnboundedReceiver<Message>,
}

impl ChannelReceiver {
    pub fn new() -> (mpsc::UnboundedSender<Message>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// A receiver pre-loaded with `msgs` that reports `Closed` after them.
    pub fn scripted(msgs: Vec<Message>) -> Self {
        let (tx, rx) = Self::new();
        for msg in msgs {
            tx.send(msg).unwrap();
        }
        rx
    }
}

#[async_trait]
impl MessageReceiver for ChannelReceiver {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}

/// Source replaying a fixed event list.
pub struct ScriptedSource {
    partition: Partition,
    events: VecDeque<Message>,
    failure: Option<String>,
}

impl ScriptedSource {
    pub fn new(partition: Partition, events: Vec<Message>) -> Self {
        Self {
            partition,
            events: events.into(),
            failure: None,
        }
    }

    /// Report the source as unavailable once the scripted events run out.
    pub fn failing_with(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn partition(&self) -> Partition {
        self.partition.clone()
    }

    async fn next_event(&mut self) -> Result<Option<Message>, SourceError> {
        match (self.events.pop_front(), self.failure.take()) {
            (Some(msg), failure) => {
                self.failure = failure;
                Ok(Some(msg))
            }
            (None, Some(reason)) => Err(SourceError::Unavailable(reason)),
            (None, None) => Ok(None),
        }
    }
}

/// Control channel driven by the test. Errors can be injected to check that
/// the listener survives them.
pub struct ScriptedControl {
    rx: mpsc::UnboundedReceiver<Result<GraphConfig, TransportError>>,
}

impl ScriptedControl {
    pub fn new() -> (
        mpsc::UnboundedSender<Result<GraphConfig, TransportError>>,
        Self,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl ControlChannel for ScriptedControl {
    async fn next_update(&mut self) -> Result<GraphConfig, TransportError> {
        self.rx.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

/// Graph that tracks calls instead of computing anything.
#[derive(Default)]
pub struct MockGraph {
    pending: Mutex<Option<GraphConfig>>,
    committed: Mutex<Option<GraphConfig>>,
    executed: Mutex<Vec<Vec<String>>>,
    updates: AtomicUsize,
    configures: AtomicUsize,
    reverts: AtomicUsize,
    fail_configure: AtomicBool,
    fail_execute: AtomicBool,
}

impl MockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph whose committed configuration is already `config`.
    pub fn with_committed(config: GraphConfig) -> Self {
        let graph = Self::default();
        *graph.committed.lock().unwrap() = Some(config);
        graph
    }

    pub fn fail_configure(&self, fail: bool) {
        self.fail_configure.store(fail, Ordering::SeqCst);
    }

    pub fn fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }

    pub fn committed(&self) -> Option<GraphConfig> {
        self.committed.lock().unwrap().clone()
    }

    pub fn committed_label(&self) -> Option<String> {
        self.committed().map(|c| c.label().to_string())
    }

    pub fn pending(&self) -> Option<GraphConfig> {
        self.pending.lock().unwrap().clone()
    }

    pub fn executed(&self) -> Vec<Vec<String>> {
        self.executed.lock().unwrap().clone()
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn configure_calls(&self) -> usize {
        self.configures.load(Ordering::SeqCst)
    }

    pub fn revert_calls(&self) -> usize {
        self.reverts.load(Ordering::SeqCst)
    }
}

impl Graph for MockGraph {
    fn update(&self, config: GraphConfig) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        *self.pending.lock().unwrap() = Some(config);
    }

    fn configure(&self) -> Result<(), GraphError> {
        self.configures.fetch_add(1, Ordering::SeqCst);
        let pending = self.pending.lock().unwrap().take();
        if self.fail_configure.load(Ordering::SeqCst) {
            return Err(GraphError::config("mock configure failure"));
        }
        if let Some(config) = pending {
            *self.committed.lock().unwrap() = Some(config);
        }
        Ok(())
    }

    fn revert(&self) -> Result<(), GraphError> {
        self.reverts.fetch_add(1, Ordering::SeqCst);
        if self.committed.lock().unwrap().is_none() {
            return Err(GraphError::NoCommittedConfig);
        }
        Ok(())
    }

    fn execute(&self, _store: &mut ResultStore, updated: &[String]) -> Result<(), GraphError> {
        self.executed.lock().unwrap().push(updated.to_vec());
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(GraphError::runtime("mock", "mock execute failure"));
        }
        Ok(())
    }
}
