//! Helpfulness pruning for the final visited set

use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::hop::{HopResult, VisitedSet};
use std::cmp::Ordering;

/// Combined helpfulness of one visited node: similarity blended with
/// its visit count normalized against the set's maximum.
pub fn helpfulness(result: &HopResult, max_visits: u32, similarity_weight: f64) -> f64 {
    let visit_share = if max_visits == 0 {
        0.0
    } else {
        result.visit_count as f64 / max_visits as f64
    };
    similarity_weight * result.similarity_score + (1.0 - similarity_weight) * visit_share
}

/// Rank the visited set by helpfulness, drop entries below the
/// threshold, and keep the best `top_k`. The sort is stable, so ties
/// keep visit order. `top_k` is passed separately because callers may
/// override the configured value per query.
pub fn prune_visited(
    visited: VisitedSet,
    config: &RetrievalConfig,
    top_k: usize,
) -> Vec<HopResult> {
    let max_visits = visited.max_visit_count();
    let mut ranked: Vec<(f64, HopResult)> = visited
        .into_results()
        .into_iter()
        .map(|result| {
            (
                helpfulness(&result, max_visits, config.similarity_weight),
                result,
            )
        })
        .collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    ranked.retain(|(score, _)| *score >= config.prune_threshold);
    ranked.truncate(top_k);
    ranked.into_iter().map(|(_, result)| result).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttrMap, NodeId, NodeType};

    fn entry(id: &str, similarity: f64, visits: u32) -> HopResult {
        HopResult {
            node_id: NodeId::new(id),
            node_type: NodeType::new("Study"),
            attrs: AttrMap::new(),
            visit_count: visits,
            similarity_score: similarity,
            hop_path: vec![NodeId::new(id)],
        }
    }

    fn visited(entries: Vec<HopResult>) -> VisitedSet {
        let mut set = VisitedSet::new();
        for e in entries {
            set.insert(e);
        }
        set
    }

    #[test]
    fn test_helpfulness_blends_similarity_and_visits() {
        let e = entry("A", 0.5, 2);
        // 0.7 * 0.5 + 0.3 * (2/4)
        assert!((helpfulness(&e, 4, 0.7) - 0.5).abs() < 1e-9);
        // weight 1.0 ignores visits
        assert_eq!(helpfulness(&e, 4, 1.0), 0.5);
    }

    #[test]
    fn test_prune_drops_below_threshold() {
        let config = RetrievalConfig {
            prune_threshold: 0.5,
            similarity_weight: 1.0,
            ..RetrievalConfig::default()
        };
        let kept = prune_visited(
            visited(vec![entry("A", 0.9, 1), entry("B", 0.2, 1), entry("C", 0.5, 1)]),
            &config,
            config.top_k,
        );
        let ids: Vec<&str> = kept.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_prune_orders_by_combined_score() {
        let config = RetrievalConfig {
            prune_threshold: 0.0,
            similarity_weight: 0.5,
            ..RetrievalConfig::default()
        };
        // B is less similar but visited far more often
        let kept = prune_visited(
            visited(vec![entry("A", 0.6, 1), entry("B", 0.4, 4)]),
            &config,
            config.top_k,
        );
        let ids: Vec<&str> = kept.iter().map(|r| r.node_id.as_str()).collect();
        // A: 0.5*0.6 + 0.5*0.25 = 0.425; B: 0.5*0.4 + 0.5*1.0 = 0.7
        assert_eq!(ids, vec!["B", "A"]);
    }

    #[test]
    fn test_prune_truncates_to_top_k() {
        let config = RetrievalConfig {
            prune_threshold: 0.0,
            ..RetrievalConfig::default()
        };
        let kept = prune_visited(
            visited(vec![
                entry("A", 0.9, 1),
                entry("B", 0.8, 1),
                entry("C", 0.7, 1),
            ]),
            &config,
            2,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_prune_ties_keep_visit_order() {
        let config = RetrievalConfig {
            prune_threshold: 0.0,
            ..RetrievalConfig::default()
        };
        let kept = prune_visited(
            visited(vec![
                entry("A", 0.5, 1),
                entry("B", 0.5, 1),
                entry("C", 0.5, 1),
            ]),
            &config,
            config.top_k,
        );
        let ids: Vec<&str> = kept.iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_empty_visited_prunes_to_empty() {
        let kept = prune_visited(VisitedSet::new(), &RetrievalConfig::default(), 10);
        assert!(kept.is_empty());
    }
}
