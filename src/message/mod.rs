// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message model exchanged between sources, workers and collectors.
//!
//! Every unit of transport is a [`Message`], a closed sum type with one variant
//! per message kind. Workers and collectors dispatch on the variant, never on
//! the shape of the payload.
//!
//! # Example
//! ```
//! use shardwood::message::{Datagram, Message, MessageKind, Value};
//!
//! let msg = Message::Datagram(vec![Datagram::new("det1", Value::Float(3.0))]);
//! assert_eq!(msg.kind(), MessageKind::Datagram);
//! ```

pub mod wire;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag of a [`Message`], used for barrier bookkeeping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Transition,
    Occurrence,
    Datagram,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Transition => "transition",
            MessageKind::Occurrence => "occurrence",
            MessageKind::Datagram => "datagram",
        };
        f.write_str(name)
    }
}

/// Unit of transport between nodes. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Lifecycle event every worker observes and the collector collapses to one.
    Transition(Transition),
    /// Content-free synchronization pulse.
    Occurrence(Occurrence),
    /// A batch (from a source) or a collection (from a store) of datagrams.
    Datagram(Vec<Datagram>),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Transition(_) => MessageKind::Transition,
            Message::Occurrence(_) => MessageKind::Occurrence,
            Message::Datagram(_) => MessageKind::Datagram,
        }
    }

    /// Shorthand for the allocate transition carrying a partition schema.
    pub fn allocate(partition: Partition) -> Self {
        Message::Transition(Transition {
            ttype: TransitionType::Allocate,
            payload: TransitionPayload::Partition(partition),
        })
    }

    pub fn heartbeat() -> Self {
        Message::Occurrence(Occurrence::Heartbeat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Allocate,
    Configure,
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub ttype: TransitionType,
    pub payload: TransitionPayload,
}

impl Transition {
    /// A transition without payload (everything except `Allocate`).
    pub fn bare(ttype: TransitionType) -> Self {
        Self {
            ttype,
            payload: TransitionPayload::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPayload {
    Partition(Partition),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    /// Guaranteed event-stream boundary; the only point where a staged graph
    /// configuration may be committed.
    Heartbeat,
    /// The source has no more events.
    EndOfData,
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Occurrence::Heartbeat => f.write_str("heartbeat"),
            Occurrence::EndOfData => f.write_str("end_of_data"),
        }
    }
}

/// One named unit of data payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datagram {
    pub name: String,
    pub data: Value,
}

impl Datagram {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Data carried by a [`Datagram`].
///
/// Untagged so static source configs can write plain JSON values
/// (`3.0`, `[1.0, 2.0]`, `"text"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Waveform(Vec<f64>),
    Image {
        rows: usize,
        cols: usize,
        pixels: Vec<f64>,
    },
}

impl Value {
    /// The narrowest dtype able to hold this value.
    pub fn dtype(&self) -> DType {
        match self {
            Value::Bool(_) => DType::Bool,
            Value::Int(_) => DType::I64,
            Value::Float(_) => DType::F64,
            Value::Text(_) => DType::Text,
            Value::Waveform(_) => DType::Waveform,
            Value::Image { .. } => DType::Image,
        }
    }

    /// Numeric view used by scalar graph operators.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Declared data type of a store slot / partition channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    I32,
    I64,
    F32,
    F64,
    Bool,
    Text,
    Waveform,
    Image,
}

impl DType {
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (DType::I32 | DType::I64, Value::Int(_))
                | (DType::F32 | DType::F64, Value::Float(_) | Value::Int(_))
                | (DType::Bool, Value::Bool(_))
                | (DType::Text, Value::Text(_))
                | (DType::Waveform, Value::Waveform(_))
                | (DType::Image, Value::Image { .. })
        )
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::I32 => "i32",
            DType::I64 => "i64",
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::Bool => "bool",
            DType::Text => "text",
            DType::Waveform => "waveform",
            DType::Image => "image",
        };
        f.write_str(name)
    }
}

/// Newtype wrapper for the ordered channel schema a worker is responsible for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition(pub Vec<(String, DType)>);

impl Partition {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, name: impl Into<String>, dtype: DType) {
        self.0.push((name.into(), dtype));
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, DType)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, DType)>> for Partition {
    fn from(entries: Vec<(String, DType)>) -> Self {
        Self(entries)
    }
}
