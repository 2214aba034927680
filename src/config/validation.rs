//! Graph configuration validation.
//!
//! A pending [`GraphConfig`] is validated before it may be committed, so a bad
//! broadcast never replaces a working configuration. Checks run in order:
//!
//! 1. **Uniqueness**: node ids are unique
//! 2. **Shape**: every node has inputs and sane operator parameters
//! 3. **Cycle detection**: DFS over node-to-node edges
//!
//! Inputs that do not name a node refer to store slots and are resolved at
//! execution time, so there is no unresolved-reference check here.
//!
//! ## Cycle Detection Algorithm
//! Uses **Depth-First Search (DFS) with recursion stack** to detect cycles:
//! - **Time Complexity**: O(V + E) where V = nodes, E = node-to-node inputs
//! - **Advantage**: Provides the actual cycle path for debugging
//!
//! # Examples
//!
//! ```rust
//! use shardwood::config::validate_graph_config;
//! use shardwood::graph::{GraphConfig, NodeConfig, Operator};
//!
//! let config = GraphConfig {
//!     name: None,
//!     nodes: vec![NodeConfig {
//!         id: "det1_sum".to_string(),
//!         op: Operator::Sum,
//!         inputs: vec!["det1".to_string()],
//!     }],
//! };
//!
//! assert!(validate_graph_config(&config).is_ok());
//! ```

use std::collections::{HashMap, HashSet};

use crate::errors::ValidationError;
use crate::graph::{GraphConfig, Operator};

/// Validates a graph configuration for structural integrity.
///
/// Errors are accumulated so an operator sees every problem at once. Cycle
/// detection is skipped when ids are not unique, since edges would be
/// ambiguous.
pub fn validate_graph_config(config: &GraphConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(duplicate_errors) = validate_unique_node_ids(config) {
        errors.extend(duplicate_errors);
    }

    if let Err(shape_errors) = validate_node_shape(config) {
        errors.extend(shape_errors);
    }

    if errors.iter().all(|e| !matches!(e, ValidationError::DuplicateNodeId { .. })) {
        if let Err(cycle_errors) = validate_acyclic_graph(config) {
            errors.extend(cycle_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_unique_node_ids(config: &GraphConfig) -> Result<(), Vec<ValidationError>> {
    let mut seen_ids = HashSet::new();
    let mut errors = Vec::new();

    for node in &config.nodes {
        if !seen_ids.insert(&node.id) {
            errors.push(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_node_shape(config: &GraphConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for node in &config.nodes {
        if node.inputs.is_empty() {
            errors.push(ValidationError::MissingInputs {
                node_id: node.id.clone(),
            });
        }
        if let Operator::Scale { factor } = node.op {
            if !factor.is_finite() {
                errors.push(ValidationError::InvalidParameter {
                    node_id: node.id.clone(),
                    reason: format!("scale factor {} is not finite", factor),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates that node-to-node references are acyclic.
///
/// Uses the **"Three Colors" DFS approach**: a node reached again while it is
/// still on the recursion stack closes a cycle, and the path segment from that
/// node to the current one is the cycle reported.
fn validate_acyclic_graph(config: &GraphConfig) -> Result<(), Vec<ValidationError>> {
    let node_ids = config.node_ids();

    // Build adjacency list (input node -> dependent nodes)
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &config.nodes {
        graph.entry(node.id.as_str()).or_default();
    }
    for node in &config.nodes {
        for input in node.inputs.iter().filter(|i| node_ids.contains(i.as_str())) {
            graph.entry(input.as_str()).or_default().push(node.id.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    // Walk in declaration order so the reported cycle is deterministic
    for node in &config.nodes {
        if !visited.contains(node.id.as_str()) {
            if let Some(cycle) = dfs_cycle_detection(
                node.id.as_str(),
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
            ) {
                return Err(vec![ValidationError::CyclicDependency { cycle }]);
            }
        }
    }

    Ok(())
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                if let Some(cycle) = dfs_cycle_detection(neighbor, graph, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(neighbor) {
                let cycle_start = path.iter().position(|x| *x == neighbor).unwrap_or(0);
                let mut cycle: Vec<String> = path[cycle_start..].iter().map(|s| s.to_string()).collect();
                cycle.push(neighbor.to_string()); // Close the cycle
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeConfig;

    fn create_test_node(id: &str, inputs: Vec<&str>) -> NodeConfig {
        NodeConfig {
            id: id.to_string(),
            op: Operator::Latest,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn graph(nodes: Vec<NodeConfig>) -> GraphConfig {
        GraphConfig { name: None, nodes }
    }

    #[test]
    fn test_valid_empty_config() {
        assert!(validate_graph_config(&graph(vec![])).is_ok());
    }

    #[test]
    fn test_valid_linear_chain() {
        let config = graph(vec![
            create_test_node("a", vec!["det1"]),
            create_test_node("b", vec!["a"]),
            create_test_node("c", vec!["b", "det2"]),
        ]);
        assert!(validate_graph_config(&config).is_ok());
    }

    #[test]
    fn test_valid_diamond() {
        let config = graph(vec![
            create_test_node("a", vec!["det1"]),
            create_test_node("b", vec!["a"]),
            create_test_node("c", vec!["a"]),
            create_test_node("d", vec!["b", "c"]),
        ]);
        assert!(validate_graph_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_node_ids() {
        let config = graph(vec![
            create_test_node("a", vec!["det1"]),
            create_test_node("a", vec!["det2"]),
        ]);
        let errors = validate_graph_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_missing_inputs() {
        let errors = validate_graph_config(&graph(vec![create_test_node("a", vec![])])).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingInputs {
                node_id: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_non_finite_scale_factor() {
        let config = graph(vec![NodeConfig {
            id: "s".to_string(),
            op: Operator::Scale { factor: f64::NAN },
            inputs: vec!["det1".to_string()],
        }]);
        let errors = validate_graph_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidParameter { .. }));
    }

    #[test]
    fn test_self_reference_cycle() {
        let errors = validate_graph_config(&graph(vec![create_test_node("a", vec!["a"])])).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::CyclicDependency {
                cycle: vec!["a".to_string(), "a".to_string()]
            }]
        );
    }

    #[test]
    fn test_complex_cycle() {
        let config = graph(vec![
            create_test_node("a", vec!["b"]),
            create_test_node("b", vec!["c"]),
            create_test_node("c", vec!["d"]),
            create_test_node("d", vec!["b"]), // b -> c -> d -> b
        ]);
        let errors = validate_graph_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::CyclicDependency { .. }));
    }

    #[test]
    fn test_multiple_errors() {
        let config = graph(vec![
            create_test_node("a", vec![]),
            create_test_node("a", vec!["det1"]),
            create_test_node("b", vec![]),
        ]);
        let errors = validate_graph_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
