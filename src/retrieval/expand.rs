//! Candidate expansion: one hop out from the current layer

use crate::graph::{EdgeType, GraphStore, NodeId, NodeType};
use crate::retrieval::hop::VisitedSet;
use indexmap::IndexMap;

/// An unvisited neighbor proposed for the next layer
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node_id: NodeId,
    pub node_type: NodeType,

    /// Layer node this candidate was first reached from
    pub parent: NodeId,

    /// Representative edge for the reach (first one found)
    pub edge_type: EdgeType,

    /// Reaches during this expansion; starts at 1, +1 per additional
    /// layer parent
    pub visit_count: u32,

    /// Parent's path extended by this node
    pub hop_path: Vec<NodeId>,
}

/// Collect every not-yet-visited neighbor of the layer, one hop away
/// via an outgoing or incoming edge.
///
/// A neighbor reachable from several layer nodes appears once, with
/// the first reach as its representative edge and its visit count
/// reflecting all reaches. Reaching an already-visited node bumps that
/// node's visit count instead of producing a candidate. An empty
/// return is the traversal's natural termination.
pub fn expand_layer(
    store: &GraphStore,
    layer: &[NodeId],
    visited: &mut VisitedSet,
) -> Vec<Candidate> {
    let mut pool: IndexMap<NodeId, Candidate> = IndexMap::new();

    for parent in layer {
        let parent_path = match visited.get(parent) {
            Some(result) => result.hop_path.clone(),
            None => vec![parent.clone()],
        };

        let neighbors = store
            .outgoing_edges(parent)
            .into_iter()
            .map(|e| (&e.target, &e.edge_type))
            .chain(
                store
                    .incoming_edges(parent)
                    .into_iter()
                    .map(|e| (&e.source, &e.edge_type)),
            );

        for (neighbor, edge_type) in neighbors {
            if visited.contains(neighbor) {
                visited.record_revisit(neighbor);
                continue;
            }
            if let Some(candidate) = pool.get_mut(neighbor) {
                candidate.visit_count += 1;
                continue;
            }
            let Some(node) = store.get_node(neighbor) else {
                continue;
            };
            let mut hop_path = parent_path.clone();
            hop_path.push(neighbor.clone());
            pool.insert(
                neighbor.clone(),
                Candidate {
                    node_id: neighbor.clone(),
                    node_type: node.node_type.clone(),
                    parent: parent.clone(),
                    edge_type: edge_type.clone(),
                    visit_count: 1,
                    hop_path,
                },
            );
        }
    }

    pool.into_values().collect()
}
