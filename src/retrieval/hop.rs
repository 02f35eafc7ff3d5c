//! Retrieval state: hop results and the visited set

use crate::graph::{AttrMap, Node, NodeId, NodeType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Reserved attribute key under which an analytic answer is attached
/// to the node that closed the traversal
pub const ANALYTIC_RESULT_KEY: &str = "analytic_result";

/// One retrieved node with its traversal provenance.
///
/// `attrs` is a copy taken at retrieval time; the engine never hands
/// out references into the store. `similarity_score` is in [0, 1] and
/// its meaning depends on what produced it: keyword match ratio for
/// seeds, scorer output for expanded nodes, or one of the fixed
/// provenance constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopResult {
    pub node_id: NodeId,
    pub node_type: NodeType,
    pub attrs: AttrMap,
    pub visit_count: u32,
    pub similarity_score: f64,
    pub hop_path: Vec<NodeId>,
}

impl HopResult {
    /// A seed result: path of length one, single visit
    pub fn seed(node: &Node, similarity_score: f64) -> Self {
        Self {
            node_id: node.id.clone(),
            node_type: node.node_type.clone(),
            attrs: node.attrs.clone(),
            visit_count: 1,
            similarity_score,
            hop_path: vec![node.id.clone()],
        }
    }

    /// Hops taken from the seed; zero for seed nodes
    pub fn hops(&self) -> usize {
        self.hop_path.len().saturating_sub(1)
    }
}

/// Per-query record of every node retrieval has committed to.
///
/// Insertion-ordered: seeds first, then beam members hop by hop. That
/// order is the result order in reasoner mode and the stable-sort key
/// everywhere else. Grows monotonically within a query and is
/// discarded afterwards.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: IndexMap<NodeId, HopResult>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.inner.contains_key(id)
    }

    /// Insert a result. First insertion wins: a node is committed once
    /// and later reaches only bump its visit count.
    pub fn insert(&mut self, result: HopResult) {
        self.inner.entry(result.node_id.clone()).or_insert(result);
    }

    /// Count another reach of an already-visited node. Returns false
    /// if the node is not in the set.
    pub fn record_revisit(&mut self, id: &NodeId) -> bool {
        match self.inner.get_mut(id) {
            Some(result) => {
                result.visit_count += 1;
                true
            }
            None => false,
        }
    }

    /// Overwrite the similarity of a visited node (used when the
    /// reasoner selects it for continuation)
    pub fn set_similarity(&mut self, id: &NodeId, score: f64) {
        if let Some(result) = self.inner.get_mut(id) {
            result.similarity_score = score;
        }
    }

    /// Attach analytic output to the most recently visited node
    pub fn attach_analytic(&mut self, text: &str) {
        if let Some((_, result)) = self.inner.last_mut() {
            result
                .attrs
                .insert(ANALYTIC_RESULT_KEY.to_string(), text.into());
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&HopResult> {
        self.inner.get(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Largest visit count in the set, used to normalize helpfulness
    pub fn max_visit_count(&self) -> u32 {
        self.inner.values().map(|r| r.visit_count).max().unwrap_or(0)
    }

    /// Results in insertion order
    pub fn results(&self) -> impl Iterator<Item = &HopResult> {
        self.inner.values()
    }

    /// Consume into results in insertion order
    pub fn into_results(self) -> Vec<HopResult> {
        self.inner.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Node;

    fn seed(id: &str, node_type: &str, score: f64) -> HopResult {
        HopResult::seed(&Node::new(id, node_type), score)
    }

    #[test]
    fn test_seed_result() {
        let node = Node::new("SITE-014", "Site").with_attr("name", "Riverside Medical");
        let result = HopResult::seed(&node, 0.75);

        assert_eq!(result.hop_path, vec![NodeId::new("SITE-014")]);
        assert_eq!(result.hops(), 0);
        assert_eq!(result.visit_count, 1);
        assert_eq!(result.similarity_score, 0.75);
        // attrs are copied, not referenced
        assert_eq!(
            result.attrs.get("name").unwrap().as_string(),
            Some("Riverside Medical")
        );
    }

    #[test]
    fn test_insert_is_first_wins() {
        let mut visited = VisitedSet::new();
        visited.insert(seed("SUBJ-0042", "Subject", 0.9));
        visited.insert(seed("SUBJ-0042", "Subject", 0.1));

        assert_eq!(visited.len(), 1);
        assert_eq!(
            visited.get(&NodeId::new("SUBJ-0042")).unwrap().similarity_score,
            0.9
        );
    }

    #[test]
    fn test_revisit_counts() {
        let mut visited = VisitedSet::new();
        visited.insert(seed("SITE-014", "Site", 0.5));

        assert!(visited.record_revisit(&NodeId::new("SITE-014")));
        assert!(visited.record_revisit(&NodeId::new("SITE-014")));
        assert!(!visited.record_revisit(&NodeId::new("GHOST-01")));

        assert_eq!(visited.get(&NodeId::new("SITE-014")).unwrap().visit_count, 3);
        assert_eq!(visited.max_visit_count(), 3);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut visited = VisitedSet::new();
        visited.insert(seed("B-01", "Study", 0.2));
        visited.insert(seed("A-01", "Study", 0.9));

        let ids: Vec<&str> = visited.results().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["B-01", "A-01"]);
    }

    #[test]
    fn test_attach_analytic_targets_last_node() {
        let mut visited = VisitedSet::new();
        visited.insert(seed("SITE-014", "Site", 0.5));
        visited.insert(seed("NCT04538378", "Study", 0.5));

        visited.attach_analytic("27 subjects enrolled across 3 sites");

        let first = visited.get(&NodeId::new("SITE-014")).unwrap();
        assert!(!first.attrs.contains_key(ANALYTIC_RESULT_KEY));
        let last = visited.get(&NodeId::new("NCT04538378")).unwrap();
        assert_eq!(
            last.attrs.get(ANALYTIC_RESULT_KEY).unwrap().as_string(),
            Some("27 subjects enrolled across 3 sites")
        );
    }
}
