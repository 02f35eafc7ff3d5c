//! Inverted keyword index over graph nodes

use crate::graph::{GraphStore, Node, NodeId, NodeType};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Attribute keys that contribute to a node's indexed text. Everything
/// else (measurements, flags, foreign keys) is noise for keyword
/// matching and stays out of the index.
pub const ATTR_KEYS: [&str; 6] = ["name", "title", "id", "label", "description", "type"];

/// Lowercase a text and split it on non-alphanumeric boundaries.
///
/// "Phase-III (Oncology)" becomes ["phase", "iii", "oncology"]. Tokens
/// are returned in text order, duplicates included; callers that need
/// distinct tokens dedup on their side.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// The text a node contributes to the inverted index: its id plus the
/// values of the fixed attribute keys, space-joined. The type tag is
/// deliberately absent — indexing it would make every type word match
/// its whole population.
pub fn indexed_text(node: &Node) -> String {
    let mut parts = vec![node.id.to_string()];
    for key in ATTR_KEYS {
        if let Some(value) = node.get_attr(key) {
            parts.push(value.to_string());
        }
    }
    parts.join(" ")
}

/// The text a node is scored against: `indexed_text` plus the type
/// tag, which does carry signal for relevance scoring.
pub fn node_text(node: &Node) -> String {
    format!("{} {}", node.node_type, indexed_text(node))
}

/// Keyword and type index over a loaded graph.
///
/// Built once per graph in a single pass over the nodes; the build is
/// linear in total indexed text size. Posting lists keep node ids in
/// graph insertion order, and `position` exposes that order so score
/// ties break deterministically.
#[derive(Debug, Default)]
pub struct NodeIndex {
    /// token -> node ids whose indexed text contains the token
    keyword: FxHashMap<String, Vec<NodeId>>,

    /// node type -> node ids, both in insertion order
    types: IndexMap<NodeType, Vec<NodeId>>,

    /// node id -> position in the build pass
    order: FxHashMap<NodeId, usize>,
}

impl NodeIndex {
    /// Build the index from a graph store
    pub fn build(store: &GraphStore) -> Self {
        let mut index = NodeIndex::default();

        for (pos, node) in store.nodes().enumerate() {
            index.order.insert(node.id.clone(), pos);
            index
                .types
                .entry(node.node_type.clone())
                .or_default()
                .push(node.id.clone());

            let mut seen = indexmap::IndexSet::new();
            for token in tokenize(&indexed_text(node)) {
                seen.insert(token);
            }
            for token in seen {
                index
                    .keyword
                    .entry(token)
                    .or_default()
                    .push(node.id.clone());
            }
        }

        index
    }

    /// Nodes whose indexed text contains `token`, in insertion order.
    /// Unknown tokens yield an empty slice.
    pub fn postings(&self, token: &str) -> &[NodeId] {
        self.keyword
            .get(token)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Node ids of a type, in insertion order
    pub fn ids_with_type(&self, node_type: &NodeType) -> &[NodeId] {
        self.types
            .get(node_type)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// All indexed node types, in first-seen order
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.keys()
    }

    /// The node's position in the build pass, used as a tie-break key
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.order.get(id).copied()
    }

    /// Whether the id names an indexed node
    pub fn contains(&self, id: &NodeId) -> bool {
        self.order.contains_key(id)
    }

    /// Number of indexed nodes
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of distinct tokens
    pub fn token_count(&self) -> usize {
        self.keyword.len()
    }
}
