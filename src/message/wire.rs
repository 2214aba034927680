// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire encoding for [`Message`].
//!
//! Every encoded message starts with a one byte tag. Transitions and
//! occurrences follow as JSON. Datagram collections use length-prefixed
//! framing so a receiver can split an aggregate buffer without a schema:
//!
//! ```text
//! [tag=2][block 0][block 1]...[block n-1][size 0: u32 le]...[size n-1: u32 le][n: u32 le]
//! ```
//!
//! Each block is one JSON-encoded datagram. Block values are tagged with their
//! variant, and floats that JSON has no number for travel as the strings
//! `"nan"`, `"inf"` and `"-inf"`, so every [`Value`] comes back bit-for-bit
//! (NaN payloads aside).

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::WireError;
use crate::message::{Datagram, Message, Value};

const TAG_TRANSITION: u8 = 0;
const TAG_OCCURRENCE: u8 = 1;
const TAG_DATAGRAM: u8 = 2;

const FOOTER_WORD: usize = std::mem::size_of::<u32>();

pub fn encode(msg: &Message) -> Result<Bytes, WireError> {
    let mut buf = BytesMut::new();
    match msg {
        Message::Transition(transition) => {
            buf.put_u8(TAG_TRANSITION);
            buf.extend_from_slice(&serde_json::to_vec(transition)?);
        }
        Message::Occurrence(occurrence) => {
            buf.put_u8(TAG_OCCURRENCE);
            buf.extend_from_slice(&serde_json::to_vec(occurrence)?);
        }
        Message::Datagram(dgrams) => {
            buf.put_u8(TAG_DATAGRAM);
            let blocks = dgrams
                .iter()
                .map(|dgram| serde_json::to_vec(&WireDatagram::from(dgram)))
                .collect::<Result<Vec<_>, _>>()?;
            buf.extend_from_slice(&join_blocks(&blocks)?);
        }
    }
    Ok(buf.freeze())
}

pub fn decode(bytes: &[u8]) -> Result<Message, WireError> {
    let (&tag, body) = bytes.split_first().ok_or(WireError::Truncated {
        needed: 1,
        available: 0,
    })?;

    match tag {
        TAG_TRANSITION => Ok(Message::Transition(serde_json::from_slice(body)?)),
        TAG_OCCURRENCE => Ok(Message::Occurrence(serde_json::from_slice(body)?)),
        TAG_DATAGRAM => {
            let dgrams = split_blocks(body)?
                .into_iter()
                .map(|block| serde_json::from_slice::<WireDatagram>(block).map(Datagram::from))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Message::Datagram(dgrams))
        }
        other => Err(WireError::UnknownTag(other)),
    }
}

/// Concatenate opaque blocks and append the size footer.
pub fn join_blocks<B: AsRef<[u8]>>(blocks: &[B]) -> Result<Bytes, WireError> {
    let payload_len: usize = blocks.iter().map(|b| b.as_ref().len()).sum();
    let mut buf = BytesMut::with_capacity(payload_len + (blocks.len() + 1) * FOOTER_WORD);

    for block in blocks {
        buf.extend_from_slice(block.as_ref());
    }
    for block in blocks {
        let size = u32::try_from(block.as_ref().len())
            .map_err(|_| WireError::BlockTooLarge(block.as_ref().len()))?;
        buf.put_u32_le(size);
    }
    let count = u32::try_from(blocks.len()).map_err(|_| WireError::BlockTooLarge(blocks.len()))?;
    buf.put_u32_le(count);

    Ok(buf.freeze())
}

/// Split an aggregate buffer produced by [`join_blocks`] back into its blocks,
/// in their original order.
pub fn split_blocks(buf: &[u8]) -> Result<Vec<&[u8]>, WireError> {
    if buf.len() < FOOTER_WORD {
        return Err(WireError::Truncated {
            needed: FOOTER_WORD,
            available: buf.len(),
        });
    }

    let mut count_word = &buf[buf.len() - FOOTER_WORD..];
    let count = count_word.get_u32_le() as usize;

    let footer_len = count
        .checked_add(1)
        .and_then(|words| words.checked_mul(FOOTER_WORD))
        .ok_or(WireError::BadFooter { count })?;
    if buf.len() < footer_len {
        return Err(WireError::Truncated {
            needed: footer_len,
            available: buf.len(),
        });
    }

    let payload_len = buf.len() - footer_len;
    let mut sizes = &buf[payload_len..buf.len() - FOOTER_WORD];
    let mut blocks = Vec::with_capacity(count);
    let mut offset = 0usize;

    for _ in 0..count {
        let size = sizes.get_u32_le() as usize;
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= payload_len)
            .ok_or(WireError::BadFooter { count })?;
        blocks.push(&buf[offset..end]);
        offset = end;
    }

    if offset != payload_len {
        return Err(WireError::BadFooter { count });
    }

    Ok(blocks)
}

/// A datagram as it is laid out inside one block.
#[derive(Serialize, Deserialize)]
struct WireDatagram {
    name: String,
    data: WireValue,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
enum WireValue {
    Bool(bool),
    Int(i64),
    Float(WireFloat),
    Text(String),
    Waveform(Vec<WireFloat>),
    Image {
        rows: usize,
        cols: usize,
        pixels: Vec<WireFloat>,
    },
}

/// `f64` that keeps NaN and the infinities through JSON.
#[derive(Clone, Copy)]
struct WireFloat(f64);

fn to_wire(values: &[f64]) -> Vec<WireFloat> {
    values.iter().copied().map(WireFloat).collect()
}

fn from_wire(values: Vec<WireFloat>) -> Vec<f64> {
    values.into_iter().map(|v| v.0).collect()
}

impl From<&Datagram> for WireDatagram {
    fn from(dgram: &Datagram) -> Self {
        let data = match &dgram.data {
            Value::Bool(v) => WireValue::Bool(*v),
            Value::Int(v) => WireValue::Int(*v),
            Value::Float(v) => WireValue::Float(WireFloat(*v)),
            Value::Text(v) => WireValue::Text(v.clone()),
            Value::Waveform(v) => WireValue::Waveform(to_wire(v)),
            Value::Image { rows, cols, pixels } => WireValue::Image {
                rows: *rows,
                cols: *cols,
                pixels: to_wire(pixels),
            },
        };
        Self {
            name: dgram.name.clone(),
            data,
        }
    }
}

impl From<WireDatagram> for Datagram {
    fn from(wire: WireDatagram) -> Self {
        let data = match wire.data {
            WireValue::Bool(v) => Value::Bool(v),
            WireValue::Int(v) => Value::Int(v),
            WireValue::Float(v) => Value::Float(v.0),
            WireValue::Text(v) => Value::Text(v),
            WireValue::Waveform(v) => Value::Waveform(from_wire(v)),
            WireValue::Image { rows, cols, pixels } => Value::Image {
                rows,
                cols,
                pixels: from_wire(pixels),
            },
        };
        Datagram::new(wire.name, data)
    }
}

impl Serialize for WireFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("nan")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

impl<'de> Deserialize<'de> for WireFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FloatVisitor;

        impl<'de> Visitor<'de> for FloatVisitor {
            type Value = WireFloat;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or one of \"nan\", \"inf\", \"-inf\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<WireFloat, E> {
                Ok(WireFloat(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<WireFloat, E> {
                Ok(WireFloat(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<WireFloat, E> {
                Ok(WireFloat(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<WireFloat, E> {
                match v {
                    "nan" => Ok(WireFloat(f64::NAN)),
                    "inf" => Ok(WireFloat(f64::INFINITY)),
                    "-inf" => Ok(WireFloat(f64::NEG_INFINITY)),
                    other => Err(E::invalid_value(Unexpected::Str(other), &self)),
                }
            }
        }

        deserializer.deserialize_any(FloatVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Occurrence, Partition, DType, Value};

    #[test]
    fn test_split_preserves_bytes_and_order() {
        let blocks: Vec<Vec<u8>> = vec![b"alpha".to_vec(), vec![], vec![0, 255, 7], b"z".to_vec()];
        let joined = join_blocks(&blocks).unwrap();
        let split = split_blocks(&joined).unwrap();

        assert_eq!(split.len(), blocks.len());
        for (got, want) in split.iter().zip(blocks.iter()) {
            assert_eq!(*got, want.as_slice());
        }
    }

    #[test]
    fn test_empty_collection() {
        let joined = join_blocks::<Vec<u8>>(&[]).unwrap();
        assert_eq!(joined.len(), 4);
        assert!(split_blocks(&joined).unwrap().is_empty());
    }

    #[test]
    fn test_datagram_collection_through_wire() {
        let msg = Message::Datagram(vec![
            Datagram::new("det1", Value::Float(3.5)),
            Datagram::new("det2", Value::Waveform(vec![1.0, 2.0, 3.0])),
            Datagram::new("label", Value::Text("run 14".to_string())),
        ]);
        let decoded = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_non_finite_floats_through_wire() {
        let msg = Message::Datagram(vec![
            Datagram::new("nan", Value::Float(f64::NAN)),
            Datagram::new("pos", Value::Float(f64::INFINITY)),
            Datagram::new("neg", Value::Float(f64::NEG_INFINITY)),
            Datagram::new("trace", Value::Waveform(vec![1.0, f64::NAN, f64::INFINITY])),
            Datagram::new(
                "frame",
                Value::Image {
                    rows: 1,
                    cols: 2,
                    pixels: vec![f64::NEG_INFINITY, -0.0],
                },
            ),
        ]);
        let Message::Datagram(decoded) = decode(&encode(&msg).unwrap()).unwrap() else {
            panic!("expected a datagram collection");
        };

        assert!(matches!(decoded[0].data, Value::Float(v) if v.is_nan()));
        assert_eq!(decoded[1].data, Value::Float(f64::INFINITY));
        assert_eq!(decoded[2].data, Value::Float(f64::NEG_INFINITY));
        match &decoded[3].data {
            Value::Waveform(w) => {
                assert_eq!(w[0], 1.0);
                assert!(w[1].is_nan());
                assert_eq!(w[2], f64::INFINITY);
            }
            other => panic!("expected a waveform, got {:?}", other),
        }
        match &decoded[4].data {
            Value::Image { pixels, .. } => {
                assert_eq!(pixels[0], f64::NEG_INFINITY);
                assert!(pixels[1] == 0.0 && pixels[1].is_sign_negative());
            }
            other => panic!("expected an image, got {:?}", other),
        }
    }

    #[test]
    fn test_value_variant_survives_wire() {
        let msg = Message::Datagram(vec![
            Datagram::new("label", Value::Text("nan".to_string())),
            Datagram::new("det1", Value::Float(3.0)),
            Datagram::new("events", Value::Int(3)),
        ]);
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_null_float_block_rejected() {
        let block = br#"{"name":"det1","data":{"t":"float","v":null}}"#;
        let mut buf = vec![TAG_DATAGRAM];
        buf.extend_from_slice(&join_blocks(&[block.as_slice()]).unwrap());
        assert!(matches!(decode(&buf), Err(WireError::Json(_))));
    }

    #[test]
    fn test_control_messages_through_wire() {
        let mut partition = Partition::new();
        partition.push("det1", DType::F32);
        for msg in [Message::allocate(partition), Message::Occurrence(Occurrence::EndOfData)] {
            assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
        }
    }

    #[test]
    fn test_truncated_footer_rejected() {
        let joined = join_blocks(&[b"abc".to_vec(), b"de".to_vec()]).unwrap();
        let result = split_blocks(&joined[..joined.len() - 6]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sizes_exceeding_payload_rejected() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(b"ab");
        buf.put_u32_le(10);
        buf.put_u32_le(1);
        assert!(matches!(
            split_blocks(&buf),
            Err(WireError::BadFooter { count: 1 })
        ));
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(decode(&[9, 0]), Err(WireError::UnknownTag(9))));
        assert!(matches!(decode(&[]), Err(WireError::Truncated { .. })));
    }
}
