// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Graph configuration documents.
//!
//! A [`GraphConfig`] is what a manager broadcasts and what a
//! [`crate::traits::Graph`] stages as its pending configuration. It is plain
//! data: YAML on disk, JSON on the control channel.
//!
//! # Example
//! ```yaml
//! name: det1-sum
//! nodes:
//!   - id: det1_sum
//!     op: sum
//!     inputs: [det1]
//!   - id: det1_scaled
//!     op: scale
//!     factor: 0.5
//!     inputs: [det1_sum]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// One node of the graph. Inputs name either another node or a store slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    #[serde(flatten)]
    pub op: Operator,
    #[serde(default)]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operator {
    /// Running sum of every updated input value.
    Sum,
    /// Copy of the most recently updated input.
    Latest,
    /// Most recently updated input multiplied by `factor`.
    Scale { factor: f64 },
    /// Number of times the node fired.
    Count,
}

impl GraphConfig {
    /// Label used in log lines.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// Node indices ordered so every node comes after the nodes it reads from
    /// (Kahn's algorithm over node-to-node edges). `None` if the nodes form a
    /// cycle.
    pub fn topological_order(&self) -> Option<Vec<usize>> {
        let index: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                if let Some(&upstream) = index.get(input.as_str()) {
                    in_degree[i] += 1;
                    dependents[upstream].push(i);
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        (order.len() == self.nodes.len()).then_some(order)
    }
}
