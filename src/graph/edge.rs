//! Edge implementation for the study graph

use super::attrs::{AttrMap, AttrValue};
use super::types::{EdgeType, NodeId};
use serde::{Deserialize, Serialize};

/// A directed, typed edge.
///
/// Edges are addressed by their position in the store's edge arena;
/// they carry no id of their own. Multiple edges between the same pair
/// of nodes are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Source node (edge goes FROM this node)
    pub source: NodeId,

    /// Target node (edge goes TO this node)
    pub target: NodeId,

    /// Type of relationship (e.g., "ENROLLED_AT", "HAS_VISIT")
    pub edge_type: EdgeType,

    /// Attributes associated with this edge
    pub attrs: AttrMap,
}

impl Edge {
    /// Create a new directed edge
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        edge_type: impl Into<EdgeType>,
    ) -> Self {
        Edge {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            attrs: AttrMap::new(),
        }
    }

    /// Builder-style attribute setter for graph construction
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Get an attribute value
    pub fn get_attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Check if this edge connects two specific nodes (in either direction)
    pub fn connects(&self, node1: &NodeId, node2: &NodeId) -> bool {
        (self.source == *node1 && self.target == *node2)
            || (self.source == *node2 && self.target == *node1)
    }

    /// Check if this edge goes FROM a specific node
    pub fn starts_from(&self, node: &NodeId) -> bool {
        self.source == *node
    }

    /// Check if this edge goes TO a specific node
    pub fn ends_at(&self, node: &NodeId) -> bool {
        self.target == *node
    }

    /// The endpoint opposite to `node`, used when walking edges from
    /// either direction
    pub fn other_end(&self, node: &NodeId) -> &NodeId {
        if self.source == *node {
            &self.target
        } else {
            &self.source
        }
    }
}
