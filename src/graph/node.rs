//! Node implementation for the study graph

use super::attrs::{AttrMap, AttrValue};
use super::types::{NodeId, NodeType};
use serde::{Deserialize, Serialize};

/// A typed, attributed node.
///
/// Every node carries exactly one type (Study, Site, Subject, ...) and
/// a flat attribute map. There is no versioning: the engine treats the
/// graph as read-only once loaded, and retrieval copies attributes out
/// rather than holding references into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,

    /// Node type, the unit of grouping for indexing and context formatting
    pub node_type: NodeType,

    /// Attributes associated with this node
    pub attrs: AttrMap,
}

impl Node {
    /// Create a new node with no attributes
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<NodeType>) -> Self {
        Node {
            id: id.into(),
            node_type: node_type.into(),
            attrs: AttrMap::new(),
        }
    }

    /// Builder-style attribute setter for graph construction
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Set an attribute value, returning the previous one if present
    pub fn set_attr(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Option<AttrValue> {
        self.attrs.insert(key.into(), value.into())
    }

    /// Get an attribute value
    pub fn get_attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Check if an attribute exists
    pub fn has_attr(&self, key: &str) -> bool {
        self.attrs.contains_key(key)
    }

    /// Get number of attributes
    pub fn attr_count(&self) -> usize {
        self.attrs.len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node() {
        let node = Node::new("NCT04538378", "Study");
        assert_eq!(node.id, NodeId::new("NCT04538378"));
        assert_eq!(node.node_type.as_str(), "Study");
        assert_eq!(node.attr_count(), 0);
    }

    #[test]
    fn test_node_attrs() {
        let mut node = Node::new("SUBJ-0042", "Subject");

        node.set_attr("name", "Subject 42");
        node.set_attr("age", 61i64);
        node.set_attr("consented", true);

        assert_eq!(node.get_attr("name").unwrap().as_string(), Some("Subject 42"));
        assert_eq!(node.get_attr("age").unwrap().as_integer(), Some(61));
        assert_eq!(node.get_attr("consented").unwrap().as_boolean(), Some(true));
        assert_eq!(node.attr_count(), 3);
        assert!(!node.has_attr("site"));
    }

    #[test]
    fn test_node_builder() {
        let node = Node::new("SITE-014", "Site")
            .with_attr("name", "Riverside Medical Center")
            .with_attr("country", "US");

        assert_eq!(node.attr_count(), 2);
        assert_eq!(
            node.get_attr("name").unwrap().as_string(),
            Some("Riverside Medical Center")
        );
    }

    #[test]
    fn test_node_equality_by_id() {
        let node1 = Node::new("NCT04538378", "Study");
        let node2 = Node::new("NCT04538378", "Study").with_attr("phase", "III");
        let node3 = Node::new("NCT05580562", "Study");

        assert_eq!(node1, node2);
        assert_ne!(node1, node3);
    }
}
