// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! TCP socket transport.
//!
//! Four socket roles cover the topology of one node:
//!
//! - [`PushSocket`]: worker → collector and collector → final collector
//! - [`PullSocket`]: collector inbound, fair-queued across any number of pushers
//! - [`Publisher`]: broadcast side of the graph control channel
//! - [`SubSocket`]: worker side of the control channel, filtered by topic
//!
//! Every message travels as one frame of a [`LengthDelimitedCodec`]. Data
//! frames carry a [`wire`] encoded [`Message`]; control frames carry a one
//! byte topic length, the topic, then the payload.

use std::net::SocketAddr;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{Framed, FramedRead, FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;

use crate::config::ConnectOptions;
use crate::errors::{TransportError, WireError};
use crate::graph::GraphConfig;
use crate::message::{wire, Message};
use crate::observability::messages::transport::{SocketBound, SocketConnected};
use crate::observability::messages::StructuredLog;
use crate::traits::{ControlChannel, MessageReceiver, MessageSender};

/// Inbound queue depth of a pull socket before readers apply backpressure.
const PULL_QUEUE_DEPTH: usize = 1024;

/// Published frames buffered per subscriber before the slowest one lags.
const PUBLISH_QUEUE_DEPTH: usize = 64;

async fn connect_with_retry(
    role: &str,
    addr: &str,
    opts: &ConnectOptions,
) -> Result<TcpStream, TransportError> {
    let retries = opts.get_retries();
    let interval = opts.get_retry_interval();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(role, addr, error = %e, "could not disable nagle");
                }
                SocketConnected {
                    role,
                    addr,
                    attempts,
                }
                .log();
                return Ok(stream);
            }
            Err(source) if attempts >= retries => {
                return Err(TransportError::Connect {
                    addr: addr.to_string(),
                    attempts,
                    source,
                });
            }
            Err(e) => {
                tracing::debug!(role, addr, attempts, error = %e, "connect failed, retrying");
                tokio::time::sleep(interval).await;
            }
        }
    }
}

async fn bind(role: &str, addr: &str) -> Result<TcpListener, TransportError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    let local = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| addr.to_string());
    SocketBound { role, addr: &local }.log();
    Ok(listener)
}

/// Build a control frame: topic length, topic, payload.
pub fn topic_frame(topic: &str, payload: &[u8]) -> Result<Bytes, WireError> {
    let topic_len = u8::try_from(topic.len()).map_err(|_| WireError::BlockTooLarge(topic.len()))?;
    let mut buf = BytesMut::with_capacity(1 + topic.len() + payload.len());
    buf.put_u8(topic_len);
    buf.put_slice(topic.as_bytes());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a control frame into `(topic, payload)`.
pub fn split_topic_frame(frame: &[u8]) -> Result<(&[u8], &[u8]), WireError> {
    let (&topic_len, rest) = frame.split_first().ok_or(WireError::Truncated {
        needed: 1,
        available: 0,
    })?;
    let topic_len = topic_len as usize;
    if rest.len() < topic_len {
        return Err(WireError::Truncated {
            needed: topic_len,
            available: rest.len(),
        });
    }
    Ok(rest.split_at(topic_len))
}

/// Connecting half of a pipeline: every message goes to one peer.
pub struct PushSocket {
    peer: Option<SocketAddr>,
    frames: Framed<TcpStream, LengthDelimitedCodec>,
}

impl PushSocket {
    pub async fn connect(addr: &str, opts: &ConnectOptions) -> Result<Self, TransportError> {
        let stream = connect_with_retry("push", addr, opts).await?;
        Ok(Self {
            peer: stream.peer_addr().ok(),
            frames: Framed::new(stream, LengthDelimitedCodec::new()),
        })
    }
}

#[async_trait]
impl MessageSender for PushSocket {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        let frame = wire::encode(&msg)?;
        self.frames
            .send(frame)
            .await
            .map_err(|source| TransportError::Io {
                peer: self.peer,
                source,
            })
    }
}

/// Binding half of a pipeline.
///
/// Accepts any number of pushers. Each connection gets its own reader task;
/// all of them feed one queue, so messages from one peer stay in order while
/// peers interleave as their frames arrive.
pub struct PullSocket {
    local_addr: SocketAddr,
    inbound: mpsc::Receiver<Result<Message, TransportError>>,
    shutdown: CancellationToken,
}

impl PullSocket {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = bind("pull", addr).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let (tx, inbound) = mpsc::channel(PULL_QUEUE_DEPTH);
        let shutdown = CancellationToken::new();
        tokio::spawn(accept_pushers(listener, tx, shutdown.clone()));

        Ok(Self {
            local_addr,
            inbound,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for PullSocket {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_pushers(
    listener: TcpListener,
    tx: mpsc::Sender<Result<Message, TransportError>>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "pusher connected");
                tokio::spawn(read_pusher(stream, peer, tx.clone(), shutdown.clone()));
            }
            Err(e) => tracing::warn!(error = %e, "accept failed on pull socket"),
        }
    }
}

async fn read_pusher(
    stream: TcpStream,
    peer: SocketAddr,
    tx: mpsc::Sender<Result<Message, TransportError>>,
    shutdown: CancellationToken,
) {
    let mut frames = FramedRead::new(stream, LengthDelimitedCodec::new());
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = frames.next() => frame,
        };
        let item = match frame {
            None => {
                tracing::debug!(%peer, "pusher disconnected");
                return;
            }
            Some(Err(e)) => {
                tracing::warn!(%peer, error = %e, "dropping pusher after read error");
                return;
            }
            Some(Ok(bytes)) => wire::decode(&bytes).map_err(TransportError::from),
        };
        if tx.send(item).await.is_err() {
            return;
        }
    }
}

#[async_trait]
impl MessageReceiver for PullSocket {
    async fn receive(&mut self) -> Result<Message, TransportError> {
        self.inbound.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

/// Broadcast side of the control channel.
///
/// Subscribers only see frames published after they connected.
pub struct Publisher {
    local_addr: SocketAddr,
    frames: broadcast::Sender<Bytes>,
    shutdown: CancellationToken,
}

impl Publisher {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = bind("pub", addr).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let (frames, _) = broadcast::channel(PUBLISH_QUEUE_DEPTH);
        let shutdown = CancellationToken::new();
        tokio::spawn(accept_subscribers(listener, frames.clone(), shutdown.clone()));

        Ok(Self {
            local_addr,
            frames,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently connected subscribers.
    pub fn subscribers(&self) -> usize {
        self.frames.receiver_count()
    }

    /// Publish `payload` under `topic`. Returns how many subscribers it was
    /// queued for.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<usize, TransportError> {
        let frame = topic_frame(topic, payload)?;
        Ok(self.frames.send(frame).unwrap_or(0))
    }

    pub fn publish_graph(&self, config: &GraphConfig) -> Result<usize, TransportError> {
        let payload = serde_json::to_vec(config).map_err(WireError::from)?;
        self.publish(crate::config::consts::GRAPH_TOPIC, &payload)
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_subscribers(
    listener: TcpListener,
    frames: broadcast::Sender<Bytes>,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => return,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "subscriber connected");
                tokio::spawn(write_subscriber(
                    stream,
                    peer,
                    frames.subscribe(),
                    shutdown.clone(),
                ));
            }
            Err(e) => tracing::warn!(error = %e, "accept failed on publisher"),
        }
    }
}

async fn write_subscriber(
    stream: TcpStream,
    peer: SocketAddr,
    mut frames: broadcast::Receiver<Bytes>,
    shutdown: CancellationToken,
) {
    let mut sink = FramedWrite::new(stream, LengthDelimitedCodec::new());
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return,
            frame = frames.recv() => frame,
        };
        match frame {
            Ok(bytes) => {
                if let Err(e) = sink.send(bytes).await {
                    tracing::debug!(%peer, error = %e, "subscriber gone");
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(%peer, skipped, "slow subscriber skipped frames");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Subscribing side of the control channel.
///
/// Connecting never fails: a background task keeps (re)connecting to the
/// publisher at the configured retry interval, so a worker may start before
/// anything publishes graphs.
pub struct SubSocket {
    updates: mpsc::Receiver<Result<GraphConfig, TransportError>>,
    shutdown: CancellationToken,
}

impl SubSocket {
    pub fn connect(addr: &str, topic: &str, opts: &ConnectOptions) -> Self {
        let (tx, updates) = mpsc::channel(PUBLISH_QUEUE_DEPTH);
        let shutdown = CancellationToken::new();
        tokio::spawn(subscribe_loop(
            addr.to_string(),
            topic.to_string(),
            opts.clone(),
            tx,
            shutdown.clone(),
        ));
        Self { updates, shutdown }
    }
}

impl Drop for SubSocket {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn subscribe_loop(
    addr: String,
    topic: String,
    opts: ConnectOptions,
    tx: mpsc::Sender<Result<GraphConfig, TransportError>>,
    shutdown: CancellationToken,
) {
    loop {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => return,
            stream = connect_with_retry("sub", &addr, &opts) => stream,
        };
        match stream {
            Ok(stream) => {
                if !forward_matching(stream, topic.as_bytes(), &tx, &shutdown).await {
                    return;
                }
                tracing::debug!(addr = %addr, "publisher went away, reconnecting");
            }
            Err(e) => {
                tracing::debug!(addr = %addr, error = %e, "publisher unreachable, still trying");
                tokio::time::sleep(opts.get_retry_interval()).await;
            }
        }
    }
}

/// Relay matching frames until the connection ends. Returns `false` once the
/// subscription itself is over.
async fn forward_matching(
    stream: TcpStream,
    topic: &[u8],
    tx: &mpsc::Sender<Result<GraphConfig, TransportError>>,
    shutdown: &CancellationToken,
) -> bool {
    let mut frames = FramedRead::new(stream, LengthDelimitedCodec::new());
    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => return false,
            frame = frames.next() => frame,
        };
        let bytes = match frame {
            None | Some(Err(_)) => return true,
            Some(Ok(bytes)) => bytes,
        };
        let item = match split_topic_frame(&bytes) {
            Ok((t, _)) if t != topic => continue,
            Ok((_, payload)) => serde_json::from_slice::<GraphConfig>(payload)
                .map_err(|e| TransportError::from(WireError::from(e))),
            Err(e) => Err(e.into()),
        };
        if tx.send(item).await.is_err() {
            return false;
        }
    }
}

#[async_trait]
impl ControlChannel for SubSocket {
    async fn next_update(&mut self) -> Result<GraphConfig, TransportError> {
        self.updates.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::consts::GRAPH_TOPIC;
    use crate::graph::{NodeConfig, Operator};
    use crate::message::{Datagram, Value};
    use std::time::Duration;

    fn fast_retry() -> ConnectOptions {
        ConnectOptions {
            retries: Some(20),
            retry_interval_ms: Some(10),
        }
    }

    async fn wait_for_subscribers(publisher: &Publisher, n: usize) {
        for _ in 0..500 {
            if publisher.subscribers() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("subscribers never connected");
    }

    #[test]
    fn test_topic_frame_split() {
        let frame = topic_frame("graph", b"{}").unwrap();
        let (topic, payload) = split_topic_frame(&frame).unwrap();
        assert_eq!(topic, b"graph");
        assert_eq!(payload, b"{}");

        assert!(split_topic_frame(&[]).is_err());
        assert!(split_topic_frame(&[9, b'a']).is_err());
    }

    #[tokio::test]
    async fn test_push_pull_preserves_per_sender_order() {
        let mut pull = PullSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = pull.local_addr().to_string();
        let mut push = PushSocket::connect(&addr, &fast_retry()).await.unwrap();

        for i in 0..10 {
            let msg = Message::Datagram(vec![Datagram::new("det1", Value::Int(i))]);
            push.send(msg).await.unwrap();
        }

        for i in 0..10 {
            let msg = pull.receive().await.unwrap();
            assert_eq!(
                msg,
                Message::Datagram(vec![Datagram::new("det1", Value::Int(i))])
            );
        }
    }

    #[tokio::test]
    async fn test_pull_fair_queues_many_pushers() {
        let mut pull = PullSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = pull.local_addr().to_string();

        let mut pushers = Vec::new();
        for _ in 0..3 {
            pushers.push(PushSocket::connect(&addr, &fast_retry()).await.unwrap());
        }
        for push in pushers.iter_mut() {
            push.send(Message::heartbeat()).await.unwrap();
        }

        for _ in 0..3 {
            assert_eq!(pull.receive().await.unwrap(), Message::heartbeat());
        }
    }

    #[tokio::test]
    async fn test_push_gives_up_after_retries() {
        // Bind then drop to get a port nothing listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let opts = ConnectOptions {
            retries: Some(2),
            retry_interval_ms: Some(1),
        };
        let result = PushSocket::connect(&addr, &opts).await;
        assert!(matches!(
            result,
            Err(TransportError::Connect { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_sub_receives_graph_and_skips_other_topics() {
        let publisher = Publisher::bind("127.0.0.1:0").await.unwrap();
        let addr = publisher.local_addr().to_string();
        let mut sub = SubSocket::connect(&addr, GRAPH_TOPIC, &fast_retry());
        wait_for_subscribers(&publisher, 1).await;

        let graph = GraphConfig {
            name: Some("det1-sum".to_string()),
            nodes: vec![NodeConfig {
                id: "det1_sum".to_string(),
                op: Operator::Sum,
                inputs: vec!["det1".to_string()],
            }],
        };
        publisher.publish("command", b"ignored").unwrap();
        assert_eq!(publisher.publish_graph(&graph).unwrap(), 1);

        let received = tokio::time::timeout(Duration::from_secs(5), sub.next_update())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, graph);
    }

    #[tokio::test]
    async fn test_sub_reports_malformed_graph_and_keeps_going() {
        let publisher = Publisher::bind("127.0.0.1:0").await.unwrap();
        let addr = publisher.local_addr().to_string();
        let mut sub = SubSocket::connect(&addr, GRAPH_TOPIC, &fast_retry());
        wait_for_subscribers(&publisher, 1).await;

        publisher.publish(GRAPH_TOPIC, b"not json").unwrap();
        publisher.publish_graph(&GraphConfig::default()).unwrap();

        assert!(matches!(
            sub.next_update().await,
            Err(TransportError::Wire(WireError::Json(_)))
        ));
        assert_eq!(sub.next_update().await.unwrap(), GraphConfig::default());
    }
}
