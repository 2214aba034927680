// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::net::SocketAddr;

/// Malformed bytes on the wire.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("buffer truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("footer describing {count} blocks does not match the payload")]
    BadFooter { count: usize },

    #[error("block of {0} bytes does not fit the footer")]
    BlockTooLarge(usize),

    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    #[error("json payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer side is gone and no further message can ever arrive.
    #[error("channel closed")]
    Closed,

    #[error("could not connect to {addr} after {attempts} attempts: {source}")]
    Connect {
        addr: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o on {peer:?}: {source}")]
    Io {
        peer: Option<SocketAddr>,
        #[source]
        source: std::io::Error,
    },

    #[error("rank {rank} is outside a world of size {size}")]
    InvalidRank { rank: usize, size: usize },

    #[error("control channel lagged, {0} updates dropped")]
    Lagged(u64),

    #[error(transparent)]
    Wire(#[from] WireError),
}
