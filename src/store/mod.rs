// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-process buffer of named data slots.
//!
//! A `ResultStore` bridges what the graph reads and writes to what the
//! transport sends upstream. It is owned by exactly one worker main loop or
//! one collector and is never shared across tasks.
//!
//! Slots are created once per allocate transition, overwritten on every
//! datagram, and the whole store is sent upstream on every [`ResultStore::collect`].
//! Collecting does not clear slots: a later graph run may re-read a value that
//! was not updated by the current event.

use std::collections::HashMap;

use crate::errors::{StoreError, TransportError};
use crate::message::{DType, Datagram, Message, Value};
use crate::traits::MessageSender;

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    dtype: DType,
    value: Option<Value>,
    /// Slots registered through `create`. Slots that only appeared through
    /// `merge` are undeclared until a `create` for the same name arrives.
    declared: bool,
}

pub struct ResultStore {
    name: String,
    slots: HashMap<String, Slot>,
    sender: Box<dyn MessageSender>,
}

impl ResultStore {
    pub fn new(name: impl Into<String>, sender: Box<dyn MessageSender>) -> Self {
        Self {
            name: name.into(),
            slots: HashMap::new(),
            sender,
        }
    }

    /// Register a slot.
    ///
    /// Fails with [`StoreError::DuplicateSlot`] if `name` was already created.
    /// An undeclared slot left behind by [`ResultStore::merge`] is declared
    /// instead; its value survives only if it fits `dtype`.
    pub fn create(&mut self, name: &str, dtype: DType) -> Result<(), StoreError> {
        match self.slots.get_mut(name) {
            Some(slot) if slot.declared => Err(StoreError::DuplicateSlot(name.to_string())),
            Some(slot) => {
                slot.declared = true;
                slot.dtype = dtype;
                if slot.value.as_ref().is_some_and(|v| !dtype.accepts(v)) {
                    slot.value = None;
                }
                Ok(())
            }
            None => {
                self.slots.insert(
                    name.to_string(),
                    Slot {
                        dtype,
                        value: None,
                        declared: true,
                    },
                );
                Ok(())
            }
        }
    }

    /// Overwrite an existing slot with the datagram's value.
    pub fn put_dgram(&mut self, dgram: Datagram) -> Result<(), StoreError> {
        let slot = self
            .slots
            .get_mut(&dgram.name)
            .ok_or_else(|| StoreError::UnknownSlot(dgram.name.clone()))?;

        if !slot.dtype.accepts(&dgram.data) {
            return Err(StoreError::TypeMismatch {
                name: dgram.name,
                expected: slot.dtype,
                actual: dgram.data.dtype(),
            });
        }

        slot.value = Some(dgram.data);
        Ok(())
    }

    /// Overwrite a slot, creating an undeclared one if the name is unknown.
    /// Latest value wins.
    ///
    /// Declared slots keep their dtype and reject values that do not fit it.
    /// An undeclared slot takes the dtype of whatever value arrives last, so an
    /// `Int` followed by a `Float` for the same name is not a mismatch.
    pub fn merge(&mut self, dgram: Datagram) -> Result<(), StoreError> {
        if self.slots.get(&dgram.name).is_some_and(|slot| slot.declared) {
            return self.put_dgram(dgram);
        }
        self.slots.insert(
            dgram.name,
            Slot {
                dtype: dgram.data.dtype(),
                value: Some(dgram.data),
                declared: false,
            },
        );
        Ok(())
    }

    /// Send every slot holding a value upstream as one datagram collection.
    ///
    /// Returns the number of datagrams sent. Nothing is sent if no slot holds
    /// a value yet.
    pub async fn collect(&mut self) -> Result<usize, TransportError> {
        let mut dgrams: Vec<Datagram> = self
            .slots
            .iter()
            .filter_map(|(name, slot)| {
                slot.value
                    .as_ref()
                    .map(|value| Datagram::new(name.clone(), value.clone()))
            })
            .collect();

        if dgrams.is_empty() {
            return Ok(0);
        }

        dgrams.sort_by(|a, b| a.name.cmp(&b.name));
        let count = dgrams.len();
        tracing::trace!(store = %self.name, datagrams = count, "collecting store");
        self.sender.send(Message::Datagram(dgrams)).await?;
        Ok(count)
    }

    /// Send a freshly constructed message upstream.
    pub async fn message(&mut self, msg: Message) -> Result<(), TransportError> {
        self.sender.send(msg).await
    }

    /// Relay a message upstream verbatim.
    pub async fn forward(&mut self, msg: Message) -> Result<(), TransportError> {
        self.sender.send(msg).await
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).and_then(|slot| slot.value.as_ref())
    }

    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.slots.get(name).map(|slot| slot.dtype)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Names of all slots, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("name", &self.name)
            .field("slot_count", &self.slots.len())
            .field("slot_names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::RecordingSender;

    fn store() -> (ResultStore, RecordingSender) {
        let sender = RecordingSender::new();
        (ResultStore::new("test", Box::new(sender.clone())), sender)
    }

    #[test]
    fn test_create_registers_each_name_once() {
        let (mut store, _) = store();
        store.create("det1", DType::F32).unwrap();
        store.create("det2", DType::Waveform).unwrap();

        assert_eq!(store.names(), vec!["det1", "det2"]);
        assert_eq!(
            store.create("det1", DType::F32),
            Err(StoreError::DuplicateSlot("det1".to_string()))
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_put_dgram_requires_slot() {
        let (mut store, _) = store();
        let result = store.put_dgram(Datagram::new("ghost", Value::Float(1.0)));
        assert_eq!(result, Err(StoreError::UnknownSlot("ghost".to_string())));
    }

    #[test]
    fn test_put_dgram_overwrites_and_checks_type() {
        let (mut store, _) = store();
        store.create("det1", DType::F32).unwrap();
        store.put_dgram(Datagram::new("det1", Value::Float(1.0))).unwrap();
        store.put_dgram(Datagram::new("det1", Value::Float(2.0))).unwrap();
        assert_eq!(store.get("det1"), Some(&Value::Float(2.0)));

        let result = store.put_dgram(Datagram::new("det1", Value::Text("x".to_string())));
        assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
        assert_eq!(store.get("det1"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn test_merge_creates_undeclared_slot_that_create_can_claim() {
        let (mut store, _) = store();
        store.merge(Datagram::new("det1", Value::Float(5.0))).unwrap();
        assert!(store.contains("det1"));

        store.create("det1", DType::F32).unwrap();
        assert_eq!(store.get("det1"), Some(&Value::Float(5.0)));
        assert_eq!(
            store.create("det1", DType::F32),
            Err(StoreError::DuplicateSlot("det1".to_string()))
        );
    }

    #[test]
    fn test_merge_retypes_undeclared_slot_to_latest_value() {
        let (mut store, _) = store();
        store.merge(Datagram::new("det1", Value::Int(3))).unwrap();
        assert_eq!(store.dtype("det1"), Some(DType::I64));

        store.merge(Datagram::new("det1", Value::Float(3.5))).unwrap();
        assert_eq!(store.dtype("det1"), Some(DType::F64));
        assert_eq!(store.get("det1"), Some(&Value::Float(3.5)));

        store.merge(Datagram::new("det1", Value::Text("off".to_string()))).unwrap();
        assert_eq!(store.get("det1"), Some(&Value::Text("off".to_string())));
    }

    #[test]
    fn test_merge_into_declared_slot_keeps_dtype() {
        let (mut store, _) = store();
        store.create("det1", DType::F32).unwrap();
        store.merge(Datagram::new("det1", Value::Int(3))).unwrap();
        store.merge(Datagram::new("det1", Value::Float(3.5))).unwrap();
        assert_eq!(store.dtype("det1"), Some(DType::F32));

        let result = store.merge(Datagram::new("det1", Value::Bool(true)));
        assert!(matches!(result, Err(StoreError::TypeMismatch { .. })));
        assert_eq!(store.get("det1"), Some(&Value::Float(3.5)));
    }

    #[tokio::test]
    async fn test_collect_sends_values_without_clearing() {
        let (mut store, sender) = store();
        store.create("b", DType::I64).unwrap();
        store.create("a", DType::F64).unwrap();
        store.create("empty", DType::F64).unwrap();
        store.put_dgram(Datagram::new("a", Value::Float(1.5))).unwrap();
        store.put_dgram(Datagram::new("b", Value::Int(2))).unwrap();

        assert_eq!(store.collect().await.unwrap(), 2);
        assert_eq!(store.collect().await.unwrap(), 2);

        let sent = sender.messages();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            Message::Datagram(vec![
                Datagram::new("a", Value::Float(1.5)),
                Datagram::new("b", Value::Int(2)),
            ])
        );
        assert_eq!(store.get("a"), Some(&Value::Float(1.5)));
    }

    #[tokio::test]
    async fn test_collect_on_empty_store_sends_nothing() {
        let (mut store, sender) = store();
        store.create("det1", DType::F32).unwrap();
        assert_eq!(store.collect().await.unwrap(), 0);
        assert!(sender.messages().is_empty());
    }

    #[tokio::test]
    async fn test_forward_is_verbatim() {
        let (mut store, sender) = store();
        store.forward(Message::heartbeat()).await.unwrap();
        assert_eq!(sender.messages(), vec![Message::heartbeat()]);
    }
}
