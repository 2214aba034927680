// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;
use std::sync::Mutex;

use crate::config::validate_graph_config;
use crate::errors::GraphError;
use crate::graph::{GraphConfig, NodeConfig, Operator};
use crate::message::{Datagram, Value};
use crate::store::ResultStore;
use crate::traits::Graph;

/// In-process reference graph.
///
/// Nodes fire in topological order whenever one of their inputs was updated
/// by the current event, and publish their output into the store under the
/// node id so downstream nodes (and the collector) see it like any other
/// datagram.
///
/// ## State handling
/// - `pending` is the only field the listener task touches.
/// - `committed` holds the compiled configuration plus per-node accumulators.
///   It is replaced wholesale on a successful `configure`, never edited in
///   place, so a failed configure cannot leave it half-updated.
#[derive(Debug)]
pub struct LocalGraph {
    name: String,
    pending: Mutex<Option<GraphConfig>>,
    committed: Mutex<Option<Compiled>>,
}

#[derive(Debug)]
struct Compiled {
    config: GraphConfig,
    order: Vec<usize>,
    node_ids: HashSet<String>,
    state: Vec<NodeState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct NodeState {
    sum: f64,
    fired: i64,
}

impl Compiled {
    fn compile(config: GraphConfig) -> Result<Self, GraphError> {
        validate_graph_config(&config)?;
        let order = config
            .topological_order()
            .ok_or_else(|| GraphError::config("graph nodes form a cycle"))?;
        let node_ids = config.nodes.iter().map(|n| n.id.clone()).collect();
        let state = vec![NodeState::default(); config.nodes.len()];
        Ok(Self {
            config,
            order,
            node_ids,
            state,
        })
    }
}

impl LocalGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: Mutex::new(None),
            committed: Mutex::new(None),
        }
    }

    /// Label of the committed configuration, if any.
    pub fn committed_label(&self) -> Option<String> {
        self.lock_committed()
            .as_ref()
            .map(|c| c.config.label().to_string())
    }

    pub fn has_pending(&self) -> bool {
        self.lock_pending().is_some()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<GraphConfig>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_committed(&self) -> std::sync::MutexGuard<'_, Option<Compiled>> {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Graph for LocalGraph {
    fn update(&self, config: GraphConfig) {
        *self.lock_pending() = Some(config);
    }

    fn configure(&self) -> Result<(), GraphError> {
        let Some(config) = self.lock_pending().take() else {
            return Ok(());
        };
        let label = config.label().to_string();
        let compiled = Compiled::compile(config)?;
        *self.lock_committed() = Some(compiled);
        tracing::debug!(graph = %self.name, config = %label, "committed graph configuration");
        Ok(())
    }

    fn revert(&self) -> Result<(), GraphError> {
        // A failed configure already consumed the pending config and left the
        // committed one in place, so there is nothing to undo beyond checking
        // that a known-good configuration exists.
        if self.lock_committed().is_none() {
            return Err(GraphError::NoCommittedConfig);
        }
        Ok(())
    }

    fn execute(&self, store: &mut ResultStore, updated: &[String]) -> Result<(), GraphError> {
        let mut committed = self.lock_committed();
        let Some(compiled) = committed.as_mut() else {
            return Ok(());
        };

        let mut dirty: HashSet<String> = updated.iter().cloned().collect();
        let mut fired = 0usize;

        for &i in &compiled.order {
            let node = &compiled.config.nodes[i];
            for input in &node.inputs {
                if !compiled.node_ids.contains(input) && !store.contains(input) {
                    return Err(GraphError::runtime(
                        &node.id,
                        format!("input '{}' is neither a node nor a store slot", input),
                    ));
                }
            }

            let fresh: Vec<&Value> = node
                .inputs
                .iter()
                .filter(|input| dirty.contains(input.as_str()))
                .filter_map(|input| store.get(input))
                .collect();
            if fresh.is_empty() {
                continue;
            }

            let output = fire(node, &mut compiled.state[i], &fresh)?;
            store
                .merge(Datagram::new(node.id.clone(), output))
                .map_err(|e| GraphError::runtime(&node.id, e.to_string()))?;
            dirty.insert(node.id.clone());
            fired += 1;
        }

        tracing::trace!(graph = %self.name, fired, "graph executed");
        Ok(())
    }
}

fn numeric(node: &NodeConfig, value: &Value) -> Result<f64, GraphError> {
    value.as_f64().ok_or_else(|| {
        GraphError::runtime(
            &node.id,
            format!("expected a numeric input, got {}", value.dtype()),
        )
    })
}

fn fire(node: &NodeConfig, state: &mut NodeState, fresh: &[&Value]) -> Result<Value, GraphError> {
    state.fired += 1;
    let last = fresh[fresh.len() - 1];
    match node.op {
        Operator::Sum => {
            for value in fresh {
                state.sum += numeric(node, value)?;
            }
            Ok(Value::Float(state.sum))
        }
        Operator::Latest => Ok(last.clone()),
        Operator::Scale { factor } => Ok(Value::Float(numeric(node, last)? * factor)),
        Operator::Count => Ok(Value::Int(state.fired)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::RecordingSender;
    use crate::message::DType;

    fn node(id: &str, op: Operator, inputs: &[&str]) -> NodeConfig {
        NodeConfig {
            id: id.to_string(),
            op,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn graph_config(name: &str, nodes: Vec<NodeConfig>) -> GraphConfig {
        GraphConfig {
            name: Some(name.to_string()),
            nodes,
        }
    }

    fn store_with(channels: &[(&str, DType)]) -> ResultStore {
        let mut store = ResultStore::new("test", Box::new(RecordingSender::new()));
        for (name, dtype) in channels {
            store.create(name, *dtype).unwrap();
        }
        store
    }

    fn put(store: &mut ResultStore, name: &str, value: Value) -> Vec<String> {
        store.put_dgram(Datagram::new(name, value)).unwrap();
        vec![name.to_string()]
    }

    #[test]
    fn test_configure_without_pending_is_noop() {
        let graph = LocalGraph::new("g");
        assert!(graph.configure().is_ok());
        assert_eq!(graph.committed_label(), None);
    }

    #[test]
    fn test_execute_without_committed_config_does_nothing() {
        let graph = LocalGraph::new("g");
        let mut store = store_with(&[("det1", DType::F64)]);
        let updated = put(&mut store, "det1", Value::Float(1.0));
        graph.execute(&mut store, &updated).unwrap();
        assert_eq!(store.names(), vec!["det1"]);
    }

    #[test]
    fn test_sum_accumulates_across_events() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config("sum", vec![node("total", Operator::Sum, &["det1"])]));
        graph.configure().unwrap();

        let mut store = store_with(&[("det1", DType::F32)]);
        let updated = put(&mut store, "det1", Value::Float(3.0));
        graph.execute(&mut store, &updated).unwrap();
        let updated = put(&mut store, "det1", Value::Float(4.0));
        graph.execute(&mut store, &updated).unwrap();

        assert_eq!(store.get("total"), Some(&Value::Float(7.0)));
    }

    #[test]
    fn test_chain_fires_in_dependency_order() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config(
            "chain",
            vec![
                node("scaled", Operator::Scale { factor: 2.0 }, &["latest"]),
                node("fired", Operator::Count, &["latest"]),
                node("latest", Operator::Latest, &["det1"]),
            ],
        ));
        graph.configure().unwrap();

        let mut store = store_with(&[("det1", DType::F64), ("det2", DType::F64)]);
        let updated = put(&mut store, "det1", Value::Float(1.5));
        graph.execute(&mut store, &updated).unwrap();
        assert_eq!(store.get("scaled"), Some(&Value::Float(3.0)));
        assert_eq!(store.get("fired"), Some(&Value::Int(1)));

        // det2 feeds nothing, so no node fires
        let updated = put(&mut store, "det2", Value::Float(9.0));
        graph.execute(&mut store, &updated).unwrap();
        assert_eq!(store.get("fired"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_failed_configure_keeps_committed_config() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config("good", vec![node("a", Operator::Sum, &["det1"])]));
        graph.configure().unwrap();

        graph.update(graph_config(
            "cyclic",
            vec![
                node("a", Operator::Latest, &["b"]),
                node("b", Operator::Latest, &["a"]),
            ],
        ));
        let err = graph.configure().unwrap_err();
        assert!(matches!(err, GraphError::Config { .. }));
        assert!(graph.revert().is_ok());
        assert_eq!(graph.committed_label().as_deref(), Some("good"));
        assert!(!graph.has_pending());
    }

    #[test]
    fn test_latest_follows_input_from_int_to_float() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config("mirror", vec![node("mirror", Operator::Latest, &["det1"])]));
        graph.configure().unwrap();

        let mut store = store_with(&[("det1", DType::F64)]);
        let updated = put(&mut store, "det1", Value::Int(3));
        graph.execute(&mut store, &updated).unwrap();
        let updated = put(&mut store, "det1", Value::Float(3.5));
        graph.execute(&mut store, &updated).unwrap();

        assert_eq!(store.get("mirror"), Some(&Value::Float(3.5)));
    }

    #[test]
    fn test_revert_without_committed_config_fails() {
        let graph = LocalGraph::new("g");
        assert!(matches!(graph.revert(), Err(GraphError::NoCommittedConfig)));
    }

    #[test]
    fn test_unknown_input_is_runtime_error() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config("ghost", vec![node("a", Operator::Sum, &["nope"])]));
        graph.configure().unwrap();

        let mut store = store_with(&[("det1", DType::F64)]);
        let updated = put(&mut store, "det1", Value::Float(1.0));
        let err = graph.execute(&mut store, &updated).unwrap_err();
        assert!(matches!(err, GraphError::Runtime { ref node_id, .. } if node_id == "a"));
    }

    #[test]
    fn test_non_numeric_input_is_runtime_error() {
        let graph = LocalGraph::new("g");
        graph.update(graph_config("text", vec![node("a", Operator::Sum, &["label"])]));
        graph.configure().unwrap();

        let mut store = store_with(&[("label", DType::Text)]);
        let updated = put(&mut store, "label", Value::Text("x".to_string()));
        assert!(matches!(
            graph.execute(&mut store, &updated),
            Err(GraphError::Runtime { .. })
        ));
    }
}
