//! Candidate scoring and beam selection

use crate::exec::DataCatalog;
use crate::graph::{GraphStore, Node, NodeId};
use crate::index::{node_text, tokenize};
use crate::oracle::payload::parse_json_object;
use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::context::summarize_attrs;
use crate::retrieval::expand::Candidate;
use crate::retrieval::{OracleHandle, NEUTRAL_SCORE};
use futures::stream::{self, StreamExt};
use indexmap::IndexSet;
use lru::LruCache;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use tracing::warn;

/// A candidate with its relevance score in [0, 1]
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// Attributes included in a candidate's one-line prompt description
const PROMPT_ATTRS: usize = 4;

/// Token-overlap score for one node: the share of query tokens found
/// in the node's text, plus the node type's structural boost, clamped
/// to [0, 1]. Pure: same query, node, and boost always give the same
/// score.
pub fn heuristic_score(query_tokens: &IndexSet<String>, node: &Node, boost: f64) -> f64 {
    if query_tokens.is_empty() {
        return boost.clamp(0.0, 1.0);
    }
    let node_tokens: FxHashSet<String> = tokenize(&node_text(node)).into_iter().collect();
    let overlap = query_tokens
        .iter()
        .filter(|t| node_tokens.contains(t.as_str()))
        .count();
    (overlap as f64 / query_tokens.len() as f64 + boost).clamp(0.0, 1.0)
}

/// Score a candidate pool with the deterministic heuristic
pub fn heuristic_scores(
    config: &RetrievalConfig,
    store: &GraphStore,
    query: &str,
    candidates: Vec<Candidate>,
) -> Vec<ScoredCandidate> {
    let query_tokens: IndexSet<String> = tokenize(query).into_iter().collect();
    candidates
        .into_iter()
        .map(|candidate| {
            let score = store
                .get_node(&candidate.node_id)
                .map(|node| {
                    heuristic_score(&query_tokens, node, config.type_boost(&candidate.node_type))
                })
                .unwrap_or(0.0);
            ScoredCandidate { candidate, score }
        })
        .collect()
}

#[derive(Deserialize)]
struct ScoresPayload {
    scores: Vec<ScoreEntry>,
}

#[derive(Deserialize)]
struct ScoreEntry {
    id: String,
    score: f64,
}

fn batch_prompt(query: &str, catalog: &DataCatalog, lines: &[(NodeId, String)]) -> String {
    let listing = lines
        .iter()
        .map(|(_, line)| format!("- {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Score each candidate graph node 0-10 for how useful it is for answering the question.\n\
         \n\
         Question: {}\n\
         \n\
         Analytic data sources:\n{}\n\
         \n\
         Candidates:\n{}\n\
         \n\
         Respond with only JSON: {{\"scores\": [{{\"id\": \"<id>\", \"score\": <0-10>}}, ...]}}",
        query,
        catalog.summary(),
        listing
    )
}

fn describe_candidate(store: &GraphStore, catalog: &DataCatalog, candidate: &Candidate) -> String {
    let attrs = store
        .get_node(&candidate.node_id)
        .map(|node| summarize_attrs(&node.attrs, PROMPT_ATTRS))
        .unwrap_or_default();
    let aggregatable = if catalog.is_aggregatable(&candidate.node_type) {
        "yes"
    } else {
        "no"
    };
    format!(
        "id={} type={} via={} aggregatable={} | {}",
        candidate.node_id, candidate.node_type, candidate.edge_type, aggregatable, attrs
    )
}

async fn score_batch(
    oracle: OracleHandle<'_>,
    catalog: &DataCatalog,
    query: &str,
    lines: &[(NodeId, String)],
) -> Option<FxHashMap<NodeId, f64>> {
    let prompt = batch_prompt(query, catalog, lines);
    let response = match oracle.complete(&prompt).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, batch_size = lines.len(), "score batch failed, using neutral scores");
            return None;
        }
    };
    let payload: ScoresPayload = match parse_json_object(&response) {
        Some(payload) => payload,
        None => {
            warn!(batch_size = lines.len(), "unparsable score response, using neutral scores");
            return None;
        }
    };
    Some(
        payload
            .scores
            .into_iter()
            .map(|entry| (NodeId::new(entry.id), (entry.score / 10.0).clamp(0.0, 1.0)))
            .collect(),
    )
}

/// Score a candidate pool by asking the oracle in fixed-size batches.
///
/// Batches run concurrently through a worker pool of
/// `min(batch count, scorer_parallelism)` and are merged by candidate
/// id once all complete. Previously scored nodes come from the cache
/// without an oracle call; a failed or unparsable batch scores neutral
/// and stays out of the cache.
pub async fn semantic_scores(
    oracle: OracleHandle<'_>,
    cache: &Mutex<LruCache<NodeId, f64>>,
    store: &GraphStore,
    catalog: &DataCatalog,
    config: &RetrievalConfig,
    query: &str,
    candidates: Vec<Candidate>,
) -> Vec<ScoredCandidate> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut scores: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut uncached: Vec<(NodeId, String)> = Vec::new();
    {
        let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
        for candidate in &candidates {
            if let Some(score) = cache.get(&candidate.node_id) {
                scores.insert(candidate.node_id.clone(), *score);
                oracle.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            } else {
                uncached.push((
                    candidate.node_id.clone(),
                    describe_candidate(store, catalog, candidate),
                ));
            }
        }
    }

    if !uncached.is_empty() {
        let batches: Vec<Vec<(NodeId, String)>> = uncached
            .chunks(config.score_batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let parallelism = batches.len().min(config.scorer_parallelism).max(1);

        let outcomes: Vec<(Vec<NodeId>, Option<FxHashMap<NodeId, f64>>)> =
            stream::iter(batches.into_iter().map(|lines| async move {
                let ids: Vec<NodeId> = lines.iter().map(|(id, _)| id.clone()).collect();
                let parsed = score_batch(oracle, catalog, query, &lines).await;
                (ids, parsed)
            }))
            .buffer_unordered(parallelism)
            .collect()
            .await;

        let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
        for (ids, parsed) in outcomes {
            match parsed {
                Some(batch_scores) => {
                    for id in ids {
                        match batch_scores.get(&id) {
                            Some(&score) => {
                                // insert-if-absent keeps concurrent
                                // writes idempotent
                                if cache.peek(&id).is_none() {
                                    cache.put(id.clone(), score);
                                }
                                scores.insert(id, score);
                            }
                            None => {
                                scores.insert(id, NEUTRAL_SCORE);
                            }
                        }
                    }
                }
                None => {
                    for id in ids {
                        scores.insert(id, NEUTRAL_SCORE);
                    }
                }
            }
        }
    }

    candidates
        .into_iter()
        .map(|candidate| {
            let score = scores
                .get(&candidate.node_id)
                .copied()
                .unwrap_or(NEUTRAL_SCORE);
            ScoredCandidate { candidate, score }
        })
        .collect()
}

/// Keep the best `beam_width` candidates, highest score first. The
/// sort is stable, so equal scores keep their pool order.
pub fn select_beam(mut scored: Vec<ScoredCandidate>, beam_width: usize) -> Vec<ScoredCandidate> {
    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(beam_width);
    scored
}
