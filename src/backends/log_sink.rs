// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::TransportError;
use crate::message::Message;
use crate::traits::MessageSender;

/// Upstream sender for a collector with no final collector behind it: every
/// message is logged instead of sent.
pub struct LogSink {
    name: String,
    sent: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[async_trait]
impl MessageSender for LogSink {
    async fn send(&mut self, msg: Message) -> Result<(), TransportError> {
        self.sent += 1;
        match &msg {
            Message::Datagram(dgrams) => {
                for dgram in dgrams {
                    tracing::info!(sink = %self.name, name = %dgram.name, value = ?dgram.data, "upstream datagram");
                }
            }
            other => tracing::info!(sink = %self.name, kind = %other.kind(), message = ?other, "upstream message"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_counts_messages() {
        let mut sink = LogSink::new("upstream");
        sink.send(Message::heartbeat()).await.unwrap();
        sink.send(Message::Datagram(Vec::new())).await.unwrap();
        assert_eq!(sink.sent(), 2);
    }
}
