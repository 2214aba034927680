// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::errors::{CollectorError, TransportError};
use crate::message::{Message, MessageKind, Occurrence, Transition, TransitionPayload, TransitionType};
use crate::observability::messages::collector::{
    BarrierCompleted, BarrierProgress, CollectorFinished, UpstreamCollected,
};
use crate::observability::messages::StructuredLog;
use crate::store::ResultStore;
use crate::traits::{MessageReceiver, MessageSender};

/// Counts arrivals for one aggregated message kind.
///
/// # Examples
/// ```
/// use shardwood::engine::Barrier;
///
/// let mut barrier = Barrier::new(2);
/// assert!(!barrier.arrive());
/// assert!(barrier.arrive());
/// assert_eq!(barrier.count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Barrier {
    expected: usize,
    count: usize,
}

impl Barrier {
    pub fn new(expected: usize) -> Self {
        Self { expected, count: 0 }
    }

    /// Record one arrival. Returns `true` exactly when this arrival completes
    /// the round, at which point the count is back to zero.
    pub fn arrive(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.expected {
            self.count = 0;
            true
        } else {
            false
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn expected(&self) -> usize {
        self.expected
    }
}

/// What the collector does after handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStep {
    Continue,
    /// Every worker reported end of data and it was forwarded upstream.
    Finished,
}

/// Fan-in point of one node.
///
/// Transitions and occurrences are counted per kind and forwarded upstream
/// once per round, only after all `num_workers` workers contributed.
/// Datagram collections are merged into the upstream store as they arrive,
/// latest value wins, and the store is collected when a heartbeat round
/// completes.
pub struct Collector {
    name: String,
    num_workers: usize,
    receiver: Box<dyn MessageReceiver>,
    upstream: ResultStore,
    transitions: Barrier,
    occurrences: Barrier,
    barrier_timeout: Option<Duration>,
}

impl Collector {
    pub fn new(
        name: impl Into<String>,
        num_workers: usize,
        receiver: Box<dyn MessageReceiver>,
        upstream: Box<dyn MessageSender>,
    ) -> Self {
        let name = name.into();
        Self {
            upstream: ResultStore::new(format!("{}-upstream", name), upstream),
            name,
            num_workers,
            receiver,
            transitions: Barrier::new(num_workers),
            occurrences: Barrier::new(num_workers),
            barrier_timeout: None,
        }
    }

    /// Fail a partially filled round after `timeout` without any message.
    pub fn with_barrier_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.barrier_timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arrivals counted so far in the open round of `kind`.
    pub fn pending(&self, kind: MessageKind) -> usize {
        match kind {
            MessageKind::Transition => self.transitions.count(),
            MessageKind::Occurrence => self.occurrences.count(),
            MessageKind::Datagram => 0,
        }
    }

    pub fn upstream(&self) -> &ResultStore {
        &self.upstream
    }

    pub async fn handle(&mut self, msg: Message) -> Result<CollectorStep, CollectorError> {
        match msg {
            Message::Transition(transition) => {
                let complete = self.transitions.arrive();
                self.progress(MessageKind::Transition, &format!("{:?}", transition.ttype), complete);
                if complete {
                    self.complete_transition(transition).await?;
                }
                Ok(CollectorStep::Continue)
            }
            Message::Occurrence(occurrence) => {
                let complete = self.occurrences.arrive();
                self.progress(MessageKind::Occurrence, &occurrence.to_string(), complete);
                if complete {
                    return self.complete_occurrence(occurrence).await;
                }
                Ok(CollectorStep::Continue)
            }
            Message::Datagram(dgrams) => {
                for dgram in dgrams {
                    self.upstream.merge(dgram)?;
                }
                Ok(CollectorStep::Continue)
            }
        }
    }

    /// Receive and handle messages until every worker reported end of data or
    /// the inbound channel closes.
    pub async fn run(&mut self) -> Result<(), CollectorError> {
        loop {
            let msg = match self.receive().await {
                Ok(msg) => msg,
                Err(CollectorError::Transport(TransportError::Closed)) => {
                    CollectorFinished {
                        node: &self.name,
                        reason: "inbound channel closed",
                    }
                    .log();
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if self.handle(msg).await? == CollectorStep::Finished {
                CollectorFinished {
                    node: &self.name,
                    reason: "all workers reached end of data",
                }
                .log();
                return Ok(());
            }
        }
    }

    async fn receive(&mut self) -> Result<Message, CollectorError> {
        let open_round = self.open_round();
        match (self.barrier_timeout, open_round) {
            (Some(limit), Some((kind, received))) => {
                match tokio::time::timeout(limit, self.receiver.receive()).await {
                    Ok(msg) => Ok(msg?),
                    Err(_) => Err(CollectorError::BarrierTimeout {
                        kind,
                        received,
                        expected: self.num_workers,
                        waited: limit,
                    }),
                }
            }
            _ => Ok(self.receiver.receive().await?),
        }
    }

    fn open_round(&self) -> Option<(MessageKind, usize)> {
        [MessageKind::Transition, MessageKind::Occurrence]
            .into_iter()
            .map(|kind| (kind, self.pending(kind)))
            .find(|(_, received)| *received > 0)
    }

    fn progress(&self, kind: MessageKind, detail: &str, complete: bool) {
        let received = if complete {
            self.num_workers
        } else {
            self.pending(kind)
        };
        BarrierProgress {
            node: &self.name,
            kind,
            detail,
            received,
            expected: self.num_workers,
        }
        .log();
    }

    async fn complete_transition(&mut self, transition: Transition) -> Result<(), CollectorError> {
        if transition.ttype == TransitionType::Allocate {
            if let TransitionPayload::Partition(partition) = &transition.payload {
                for (name, dtype) in partition.iter() {
                    self.upstream.create(name, *dtype)?;
                }
            }
        }
        BarrierCompleted {
            node: &self.name,
            kind: MessageKind::Transition,
            workers: self.num_workers,
        }
        .log();
        self.upstream.forward(Message::Transition(transition)).await?;
        Ok(())
    }

    async fn complete_occurrence(
        &mut self,
        occurrence: Occurrence,
    ) -> Result<CollectorStep, CollectorError> {
        BarrierCompleted {
            node: &self.name,
            kind: MessageKind::Occurrence,
            workers: self.num_workers,
        }
        .log();

        match occurrence {
            Occurrence::Heartbeat => {
                let datagrams = self.upstream.collect().await?;
                UpstreamCollected {
                    node: &self.name,
                    datagrams,
                }
                .log();
                self.upstream.forward(Message::Occurrence(occurrence)).await?;
                Ok(CollectorStep::Continue)
            }
            Occurrence::EndOfData => {
                self.upstream.forward(Message::Occurrence(occurrence)).await?;
                Ok(CollectorStep::Finished)
            }
        }
    }
}
