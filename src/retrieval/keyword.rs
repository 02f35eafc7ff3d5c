//! Keyword seed retrieval

use crate::graph::{GraphStore, NodeId};
use crate::index::{tokenize, NodeIndex};
use crate::retrieval::hop::HopResult;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

/// Match query tokens against the inverted index and return the top-K
/// nodes as seed results.
///
/// Each candidate scores `matching_tokens / distinct_query_tokens`.
/// Ties break toward earlier graph insertion. Runtime is proportional
/// to the query's distinct tokens and their posting lists, never the
/// graph size.
pub fn retrieve_seeds(
    index: &NodeIndex,
    store: &GraphStore,
    query: &str,
    top_k: usize,
) -> Vec<HopResult> {
    let tokens: IndexSet<String> = tokenize(query).into_iter().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut matches: FxHashMap<&NodeId, usize> = FxHashMap::default();
    for token in &tokens {
        for id in index.postings(token) {
            *matches.entry(id).or_default() += 1;
        }
    }

    let mut candidates: Vec<(&NodeId, usize)> = matches.into_iter().collect();
    // insertion order first, then a stable sort by score keeps the
    // insertion order as the tie-break
    candidates.sort_by_key(|(id, _)| index.position(id).unwrap_or(usize::MAX));
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.truncate(top_k);

    let denom = tokens.len() as f64;
    candidates
        .into_iter()
        .filter_map(|(id, count)| {
            store
                .get_node(id)
                .map(|node| HopResult::seed(node, count as f64 / denom))
        })
        .collect()
}
