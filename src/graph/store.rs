//! In-memory graph storage

use super::edge::Edge;
use super::node::Node;
use super::types::{EdgeType, NodeId, NodeType};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Errors that can occur during graph construction
#[derive(Error, Debug, PartialEq)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Node {0} already exists")]
    NodeAlreadyExists(NodeId),

    #[error("Invalid edge: source node {0} does not exist")]
    InvalidEdgeSource(NodeId),

    #[error("Invalid edge: target node {0} does not exist")]
    InvalidEdgeTarget(NodeId),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// In-memory study graph.
///
/// The store is write-once, read-many: loaders insert nodes and edges
/// up front, then retrieval only reads. Node iteration order is the
/// insertion order, which is what makes index construction and
/// tie-breaking deterministic for a given load.
///
/// - `nodes`: NodeId -> Node (insertion-ordered)
/// - `edges`: edge arena, addressed by position
/// - `outgoing` / `incoming`: NodeId -> positions into `edges`
/// - `type_index`: NodeType -> node ids in insertion order
#[derive(Debug, Default)]
pub struct GraphStore {
    nodes: IndexMap<NodeId, Node>,
    edges: Vec<Edge>,
    outgoing: FxHashMap<NodeId, Vec<usize>>,
    incoming: FxHashMap<NodeId, Vec<usize>>,
    type_index: IndexMap<NodeType, Vec<NodeId>>,
    edge_type_counts: IndexMap<EdgeType, usize>,
}

impl GraphStore {
    /// Create a new empty graph store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Ids are caller-assigned source identifiers, so a
    /// duplicate insert is a loader bug and is rejected.
    pub fn add_node(&mut self, node: Node) -> GraphResult<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::NodeAlreadyExists(node.id));
        }
        self.type_index
            .entry(node.node_type.clone())
            .or_default()
            .push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Insert a directed edge. Both endpoints must already exist.
    pub fn add_edge(&mut self, edge: Edge) -> GraphResult<()> {
        if !self.nodes.contains_key(&edge.source) {
            return Err(GraphError::InvalidEdgeSource(edge.source));
        }
        if !self.nodes.contains_key(&edge.target) {
            return Err(GraphError::InvalidEdgeTarget(edge.target));
        }

        let idx = self.edges.len();
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(idx);
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(idx);
        *self
            .edge_type_counts
            .entry(edge.edge_type.clone())
            .or_default() += 1;
        self.edges.push(edge);
        Ok(())
    }

    /// Get a node by id
    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Check if a node exists
    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get all outgoing edges from a node, in insertion order
    pub fn outgoing_edges(&self, id: &NodeId) -> Vec<&Edge> {
        self.outgoing
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Get all incoming edges to a node, in insertion order
    pub fn incoming_edges(&self, id: &NodeId) -> Vec<&Edge> {
        self.incoming
            .get(id)
            .map(|idxs| idxs.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// All nodes of a type, in insertion order
    pub fn nodes_with_type(&self, node_type: &NodeType) -> Vec<&Node> {
        self.type_index
            .get(node_type)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Node ids of a type, in insertion order
    pub fn ids_with_type(&self, node_type: &NodeType) -> &[NodeId] {
        self.type_index
            .get(node_type)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// All node types with their node counts, in first-seen order
    pub fn type_counts(&self) -> Vec<(&NodeType, usize)> {
        self.type_index.iter().map(|(t, ids)| (t, ids.len())).collect()
    }

    /// All edge types with their edge counts, in first-seen order
    pub fn edge_type_counts(&self) -> Vec<(&EdgeType, usize)> {
        self.edge_type_counts.iter().map(|(t, n)| (t, *n)).collect()
    }

    /// Iterate all nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// One-line node/edge type overview for oracle prompts
    pub fn schema_summary(&self) -> String {
        let node_part: Vec<String> = self
            .type_counts()
            .iter()
            .map(|(t, n)| format!("{} ({})", t, n))
            .collect();
        let edge_part: Vec<String> = self
            .edge_type_counts()
            .iter()
            .map(|(t, n)| format!("{} ({})", t, n))
            .collect();
        format!(
            "node types: {}; edge types: {}",
            node_part.join(", "),
            edge_part.join(", ")
        )
    }
}
