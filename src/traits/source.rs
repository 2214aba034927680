use async_trait::async_trait;

use crate::errors::SourceError;
use crate::message::{Message, Partition};

/// An event source feeding one worker.
#[async_trait]
pub trait Source: Send {
    /// The channels this worker is responsible for.
    fn partition(&self) -> Partition;

    /// Next event in enumeration order. `Ok(None)` once the source is
    /// exhausted; the sequence cannot be restarted.
    async fn next_event(&mut self) -> Result<Option<Message>, SourceError>;
}
