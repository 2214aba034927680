// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::engine::listener::{Listener, ReconfigureFlag};
use crate::errors::{GraphError, WorkerError};
use crate::message::{Datagram, Message, Occurrence};
use crate::observability::messages::worker::{
    ConfigurationCompleted, ConfigurationFailed, GraphExecutionFailed, ReconfigurationStarted,
    WorkerAllocated, WorkerFinished,
};
use crate::observability::messages::StructuredLog;
use crate::store::ResultStore;
use crate::traits::{ControlChannel, Graph, MessageSender, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Partition not yet announced and slots not yet created.
    Allocating,
    /// Processing events from the source.
    Steady,
}

/// Runs one shard of the event stream through a private graph.
///
/// Events are handled strictly one at a time in source order. A staged graph
/// configuration is only ever committed when a heartbeat is handled, never
/// between the datagrams of one event.
pub struct Worker {
    name: String,
    source: Box<dyn Source>,
    store: ResultStore,
    graph: Arc<dyn Graph>,
    flag: ReconfigureFlag,
    state: WorkerState,
    events: u64,
    reconfigurations: u64,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn Source>,
        sender: Box<dyn MessageSender>,
        graph: Arc<dyn Graph>,
    ) -> Self {
        let name = name.into();
        Self {
            store: ResultStore::new(name.clone(), sender),
            name,
            source,
            graph,
            flag: ReconfigureFlag::new(),
            state: WorkerState::Allocating,
            events: 0,
            reconfigurations: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// The flag a listener raises for this worker.
    pub fn flag(&self) -> ReconfigureFlag {
        self.flag.clone()
    }

    /// Number of configurations committed so far.
    pub fn reconfigurations(&self) -> u64 {
        self.reconfigurations
    }

    /// Start a listener that stages updates into this worker's graph.
    pub fn listen(&self, control: Box<dyn ControlChannel>, token: CancellationToken) -> Listener {
        let graph = Arc::clone(&self.graph);
        Listener::spawn(
            self.name.clone(),
            control,
            move |config| graph.update(config),
            self.flag(),
            token,
        )
    }

    /// Announce the partition upstream and create one slot per channel.
    pub async fn allocate(&mut self) -> Result<(), WorkerError> {
        let partition = self.source.partition();
        self.store.message(Message::allocate(partition.clone())).await?;
        for (name, dtype) in partition.iter() {
            self.store
                .create(name, *dtype)
                .map_err(WorkerError::Allocate)?;
        }

        WorkerAllocated {
            node: &self.name,
            channels: partition.len(),
        }
        .log();
        self.state = WorkerState::Steady;
        Ok(())
    }

    /// Handle one event.
    pub async fn handle(&mut self, msg: Message) -> Result<(), WorkerError> {
        match msg {
            Message::Occurrence(Occurrence::Heartbeat) => {
                self.apply_staged_config()?;
                self.store.forward(msg).await?;
            }
            Message::Datagram(dgrams) => self.process(dgrams).await?,
            other => self.store.forward(other).await?,
        }
        self.events += 1;
        Ok(())
    }

    /// Allocate if needed, then drain the source. Returns once the source is
    /// exhausted.
    pub async fn run(&mut self) -> Result<(), WorkerError> {
        if self.state == WorkerState::Allocating {
            self.allocate().await?;
        }

        while let Some(msg) = self.source.next_event().await? {
            self.handle(msg).await?;
        }

        WorkerFinished {
            node: &self.name,
            events: self.events,
            reconfigurations: self.reconfigurations,
        }
        .log();
        Ok(())
    }

    /// [`Worker::run`] with a listener attached for the duration of the run.
    pub async fn run_with_control(
        &mut self,
        control: Box<dyn ControlChannel>,
    ) -> Result<(), WorkerError> {
        let listener = self.listen(control, CancellationToken::new());
        let result = self.run().await;
        listener.shutdown().await;
        result
    }

    fn apply_staged_config(&mut self) -> Result<(), WorkerError> {
        if !self.flag.take() {
            return Ok(());
        }

        ReconfigurationStarted { node: &self.name }.log();
        let started = Instant::now();
        match self.graph.configure() {
            Ok(()) => {
                self.reconfigurations += 1;
                ConfigurationCompleted {
                    node: &self.name,
                    duration: started.elapsed(),
                }
                .log();
                Ok(())
            }
            Err(err @ GraphError::Config { .. }) => {
                ConfigurationFailed {
                    node: &self.name,
                    error: &err,
                }
                .log();
                self.graph.revert().map_err(WorkerError::RevertFailed)
            }
            Err(err) => Err(WorkerError::GraphRuntime(err)),
        }
    }

    async fn process(&mut self, dgrams: Vec<Datagram>) -> Result<(), WorkerError> {
        let mut updated = Vec::with_capacity(dgrams.len());
        for dgram in dgrams {
            updated.push(dgram.name.clone());
            self.store.put_dgram(dgram)?;
        }

        if let Err(err) = self.graph.execute(&mut self.store, &updated) {
            GraphExecutionFailed {
                node: &self.name,
                error: &err,
            }
            .log();
            return Err(WorkerError::GraphRuntime(err));
        }

        self.store.collect().await?;
        Ok(())
    }
}
