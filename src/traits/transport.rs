use async_trait::async_trait;

use crate::errors::TransportError;
use crate::graph::GraphConfig;
use crate::message::Message;

/// Outbound half of a transport (worker → collector, collector → upstream).
#[async_trait]
pub trait MessageSender: Send {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError>;
}

/// Inbound half of a transport. `receive` blocks until a message is available
/// and returns [`TransportError::Closed`] once none can ever arrive again.
#[async_trait]
pub trait MessageReceiver: Send {
    async fn receive(&mut self) -> Result<Message, TransportError>;
}

/// Out-of-band broadcast channel carrying graph updates to a listener.
#[async_trait]
pub trait ControlChannel: Send {
    async fn next_update(&mut self) -> Result<GraphConfig, TransportError>;
}
