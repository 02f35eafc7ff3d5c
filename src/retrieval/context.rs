//! Context formatting for retrieved results

use crate::graph::{AttrMap, NodeType};
use crate::retrieval::hop::{HopResult, ANALYTIC_RESULT_KEY};
use indexmap::IndexMap;
use std::fmt::Write;

/// What a caller sees when retrieval commits to nothing
pub const NO_RESULTS_SENTINEL: &str = "no relevant information found";

/// Representative attributes rendered per node
const MAX_RENDERED_ATTRS: usize = 6;

/// One-line `key=value` summary of an attribute map, capped at `max`
/// entries. Null values and the reserved analytic key are skipped;
/// the analytic answer gets its own line in the rendered context.
pub fn summarize_attrs(attrs: &AttrMap, max: usize) -> String {
    attrs
        .iter()
        .filter(|(key, value)| key.as_str() != ANALYTIC_RESULT_KEY && !value.is_null())
        .take(max)
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render results as question-answering context, grouped by node type
/// in first-seen order. Multi-hop nodes show how far traversal went to
/// reach them. Empty input renders the sentinel so callers never see
/// an empty string.
pub fn format_context(results: &[HopResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_SENTINEL.to_string();
    }

    let mut groups: IndexMap<&NodeType, Vec<&HopResult>> = IndexMap::new();
    for result in results {
        groups.entry(&result.node_type).or_default().push(result);
    }

    let mut out = String::new();
    for (node_type, members) in groups {
        let _ = writeln!(out, "[{}]", node_type);
        for result in members {
            let hops = result.hops();
            let summary = summarize_attrs(&result.attrs, MAX_RENDERED_ATTRS);
            let line = match (hops > 0, summary.is_empty()) {
                (false, false) => format!("- {}: {}", result.node_id, summary),
                (false, true) => format!("- {}", result.node_id),
                (true, false) => format!("- {} ({} hops): {}", result.node_id, hops, summary),
                (true, true) => format!("- {} ({} hops)", result.node_id, hops),
            };
            let _ = writeln!(out, "{}", line);
            if let Some(analytic) = result.attrs.get(ANALYTIC_RESULT_KEY) {
                let _ = writeln!(out, "  analytic_result: {}", analytic);
            }
        }
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeId};

    fn result(id: &str, node_type: &str, hops: usize) -> HopResult {
        let node = Node::new(id, node_type).with_attr("name", format!("{} name", id));
        let mut r = HopResult::seed(&node, 0.5);
        for i in 0..hops {
            r.hop_path.insert(0, NodeId::new(format!("P{}", i)));
        }
        r
    }

    #[test]
    fn test_empty_renders_sentinel() {
        assert_eq!(format_context(&[]), NO_RESULTS_SENTINEL);
    }

    #[test]
    fn test_groups_by_type_in_first_seen_order() {
        let results = vec![
            result("SITE-014", "Site", 0),
            result("NCT-1", "Study", 1),
            result("SITE-007", "Site", 0),
        ];
        let context = format_context(&results);

        let site_pos = context.find("[Site]").unwrap();
        let study_pos = context.find("[Study]").unwrap();
        assert!(site_pos < study_pos);
        // both sites render under the one Site header
        assert!(context.contains("- SITE-014: name=SITE-014 name"));
        assert!(context.contains("- SITE-007: name=SITE-007 name"));
    }

    #[test]
    fn test_multi_hop_annotation() {
        let results = vec![result("SUBJ-0042", "Subject", 2)];
        let context = format_context(&results);
        assert!(context.contains("- SUBJ-0042 (2 hops): name=SUBJ-0042 name"));
    }

    #[test]
    fn test_attr_cap() {
        let mut node = Node::new("NCT-1", "Study");
        for i in 0..10 {
            node = node.with_attr(format!("k{}", i), i as i64);
        }
        let r = HopResult::seed(&node, 0.5);
        let context = format_context(&[r]);

        assert!(context.contains("k5=5"));
        assert!(!context.contains("k6=6"));
    }

    #[test]
    fn test_analytic_result_own_line() {
        let node = Node::new("NCT-1", "Study").with_attr("phase", "III");
        let mut r = HopResult::seed(&node, 0.5);
        r.attrs
            .insert(ANALYTIC_RESULT_KEY.to_string(), "27 subjects enrolled".into());

        let context = format_context(&[r]);
        assert!(context.contains("- NCT-1: phase=III"));
        assert!(context.contains("  analytic_result: 27 subjects enrolled"));
        // not duplicated into the attr summary
        assert!(!context.contains("analytic_result=27"));
    }

    #[test]
    fn test_summarize_skips_nulls() {
        let node = Node::new("X", "Study")
            .with_attr("phase", "III")
            .with_attr("sponsor", crate::graph::AttrValue::Null);
        assert_eq!(summarize_attrs(&node.attrs, 6), "phase=III");
    }
}
