// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rank-addressed collective transport.
//!
//! A [`World`] of `size` ranks lives inside one process. Rank 0 is the
//! collector, ranks `1..size` are workers. Point-to-point traffic keeps
//! per-sender FIFO order; graph updates reach every rank through a
//! [`Broadcaster`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use crate::errors::TransportError;
use crate::graph::GraphConfig;
use crate::message::Message;
use crate::traits::{ControlChannel, MessageReceiver, MessageSender};

/// Rank every worker reports to.
pub const COLLECTOR_RANK: usize = 0;

const CONTROL_QUEUE_DEPTH: usize = 16;

pub struct World {
    communicators: Vec<Communicator>,
    broadcaster: Broadcaster,
}

impl World {
    pub fn new(size: usize) -> Self {
        let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<Message>())
            .unzip();
        let peers = Arc::new(senders);
        let (control, _) = broadcast::channel(CONTROL_QUEUE_DEPTH);

        let communicators = inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| Communicator {
                rank,
                inbox,
                peers: Arc::clone(&peers),
                control: control.clone(),
            })
            .collect();

        Self {
            communicators,
            broadcaster: Broadcaster { control },
        }
    }

    pub fn size(&self) -> usize {
        self.communicators.len()
    }

    /// Hand out the per-rank communicators (index == rank) and the broadcaster.
    pub fn into_parts(self) -> (Vec<Communicator>, Broadcaster) {
        (self.communicators, self.broadcaster)
    }
}

/// One rank's endpoint.
///
/// As a [`MessageSender`] it sends to [`COLLECTOR_RANK`]; as a
/// [`MessageReceiver`] it drains its own inbox. Every rank holds a handle to
/// every inbox, so `receive` waits for the next message rather than ever
/// reporting the world as closed while any rank is alive.
pub struct Communicator {
    rank: usize,
    inbox: mpsc::UnboundedReceiver<Message>,
    peers: Arc<Vec<mpsc::UnboundedSender<Message>>>,
    control: broadcast::Sender<GraphConfig>,
}

impl Communicator {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.peers.len()
    }

    pub fn send_to(&self, dest: usize, msg: Message) -> Result<(), TransportError> {
        let peer = self.peers.get(dest).ok_or(TransportError::InvalidRank {
            rank: dest,
            size: self.peers.len(),
        })?;
        peer.send(msg).map_err(|_| TransportError::Closed)
    }

    /// Control channel subscribed from now on.
    pub fn control(&self) -> CollectiveControl {
        CollectiveControl {
            updates: self.control.subscribe(),
        }
    }
}

#[async_trait]
impl MessageSender for Communicator {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        self.send_to(COLLECTOR_RANK, msg)
    }
}

#[async_trait]
impl MessageReceiver for Communicator {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        self.inbox.recv().await.ok_or(TransportError::Closed)
    }
}

pub struct CollectiveControl {
    updates: broadcast::Receiver<GraphConfig>,
}

#[async_trait]
impl ControlChannel for CollectiveControl {
    async fn next_update(&mut self) -> Result<GraphConfig, TransportError> {
        self.updates.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(skipped) => TransportError::Lagged(skipped),
            broadcast::error::RecvError::Closed => TransportError::Closed,
        })
    }
}

/// Publishes graph updates to every rank's control channel.
#[derive(Clone)]
pub struct Broadcaster {
    control: broadcast::Sender<GraphConfig>,
}

impl Broadcaster {
    /// Returns how many control channels the update was queued for.
    pub fn broadcast(&self, config: GraphConfig) -> usize {
        self.control.send(config).unwrap_or(0)
    }
}
