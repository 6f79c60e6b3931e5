//! Synthetic single-node evaluation context.
//!
//! Credential resolution runs outside any real workflow graph, but the
//! expression evaluator still needs somewhere to read "current node
//! parameters" from. This module builds that scaffold: one placeholder node
//! whose parameters are the field map being resolved, inside a graph with
//! no other nodes and no connections. The whole structure is discarded as
//! soon as resolution finishes.

use serde_json::{Map, Value};

/// A placeholder node standing in for the "current node" during credential
/// expression evaluation.
#[derive(Debug, Clone)]
pub struct SyntheticNode {
    /// Node name; empty for the placeholder.
    pub name: String,
    /// Node type identifier.
    pub node_type: String,
    /// The credential field map, exposed as node parameters.
    pub parameters: Map<String, Value>,
}

/// A minimal, otherwise-empty execution graph around one synthetic node.
#[derive(Debug, Clone)]
pub struct SyntheticGraph {
    nodes: Vec<SyntheticNode>,
}

impl SyntheticGraph {
    /// Build a graph containing a single placeholder node carrying
    /// `parameters`.
    pub fn single_node(parameters: Map<String, Value>) -> Self {
        Self {
            nodes: vec![SyntheticNode {
                name: String::new(),
                node_type: "placeholder".into(),
                parameters,
            }],
        }
    }

    /// The node whose parameters expressions evaluate against.
    pub fn current_node(&self) -> &SyntheticNode {
        // single_node is the only constructor, so the node always exists.
        &self.nodes[0]
    }

    /// Shorthand for the current node's parameter map.
    pub fn parameters(&self) -> &Map<String, Value> {
        &self.current_node().parameters
    }
}
