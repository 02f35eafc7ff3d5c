//! Intent fallback for queries whose keywords match too few nodes
//!
//! When keyword lookup fills less than `top_k`, the oracle classifies
//! the question's intent and names target node types and literal
//! entity ids. Literal ids become full-confidence seeds; the rest of
//! the shortfall is covered by sampling nodes of the target types.
//! Without an oracle (disabled, over budget, or failing) the sampler
//! falls back to the configured default types.

use crate::graph::{GraphStore, NodeId, NodeType};
use crate::index::NodeIndex;
use crate::oracle::payload::parse_json_object;
use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::hop::HopResult;
use crate::retrieval::{OracleHandle, DIRECT_ID_SCORE, FALLBACK_SEED_SCORE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::{debug, warn};

/// At most this many target types are sampled per fallback
const MAX_TARGET_TYPES: usize = 3;

/// Samples drawn per type when the intent is an aggregation
const AGGREGATE_SAMPLES_PER_TYPE: usize = 3;

#[derive(Debug, Deserialize)]
struct IntentPayload {
    intent: String,
    #[serde(default)]
    target_types: Vec<String>,
    #[serde(default)]
    entity_ids: Vec<String>,
}

fn intent_prompt(store: &GraphStore, query: &str) -> String {
    format!(
        "Classify the retrieval intent of a question over a clinical-study knowledge graph.\n\
         \n\
         Question: {}\n\
         \n\
         Graph schema: {}\n\
         \n\
         Pick target_types from the schema's node types. List entity_ids only for \
         identifiers quoted literally in the question.\n\
         Respond with only JSON: {{\"intent\": \"aggregate\" | \"relationship\" | \"lookup\", \
         \"target_types\": [\"<type>\", ...], \"entity_ids\": [\"<id>\", ...]}}",
        query,
        store.schema_summary()
    )
}

async fn classify_intent(
    oracle: OracleHandle<'_>,
    store: &GraphStore,
    query: &str,
) -> Option<IntentPayload> {
    let response = match oracle.complete(&intent_prompt(store, query)).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "intent classification failed, sampling default types");
            return None;
        }
    };
    let parsed = parse_json_object::<IntentPayload>(&response);
    if parsed.is_none() {
        warn!("unparsable intent response, sampling default types");
    }
    parsed
}

/// Sample up to `count` nodes of one type, skipping ids in `taken`.
/// The draw is random but the output is re-sorted into index order so
/// equal draws render identically.
fn sample_type(
    index: &NodeIndex,
    store: &GraphStore,
    rng: &mut StdRng,
    node_type: &NodeType,
    taken: &FxHashSet<NodeId>,
    count: usize,
) -> Vec<HopResult> {
    let pool: Vec<&NodeId> = index
        .ids_with_type(node_type)
        .iter()
        .filter(|id| !taken.contains(*id))
        .collect();
    let mut chosen: Vec<&NodeId> = pool.choose_multiple(rng, count).copied().collect();
    chosen.sort_by_key(|id| index.position(id).unwrap_or(usize::MAX));
    chosen
        .into_iter()
        .filter_map(|id| store.get_node(id))
        .map(|node| HopResult::seed(node, FALLBACK_SEED_SCORE))
        .collect()
}

/// Produce up to `needed` extra seeds for a query whose keywords came
/// up short. Never fails: every oracle or parse problem degrades to
/// sampling the default fallback types.
#[allow(clippy::too_many_arguments)]
pub async fn resolve_fallback_seeds(
    index: &NodeIndex,
    store: &GraphStore,
    oracle: Option<OracleHandle<'_>>,
    config: &RetrievalConfig,
    rng: &mut StdRng,
    query: &str,
    exclude: &FxHashSet<NodeId>,
    needed: usize,
) -> Vec<HopResult> {
    if needed == 0 {
        return Vec::new();
    }

    let payload = match oracle {
        Some(handle) => classify_intent(handle, store, query).await,
        None => None,
    };

    let mut seeds: Vec<HopResult> = Vec::new();
    let mut taken = exclude.clone();

    let (intent, target_types, entity_ids) = match &payload {
        Some(p) => (p.intent.as_str(), &p.target_types[..], &p.entity_ids[..]),
        None => ("relationship", &[][..], &[][..]),
    };

    // ids named literally in the question outrank sampled seeds
    for raw in entity_ids {
        if seeds.len() >= needed {
            break;
        }
        let id = NodeId::new(raw.clone());
        if taken.contains(&id) {
            continue;
        }
        if let Some(node) = store.get_node(&id) {
            taken.insert(id);
            seeds.push(HopResult::seed(node, DIRECT_ID_SCORE));
        }
    }

    let requested: Vec<NodeType> = target_types
        .iter()
        .map(|t| NodeType::new(t.clone()))
        .filter(|t| !index.ids_with_type(t).is_empty())
        .take(MAX_TARGET_TYPES)
        .collect();
    let types: Vec<NodeType> = if requested.is_empty() {
        config
            .fallback_types
            .iter()
            .filter(|t| !index.ids_with_type(t).is_empty())
            .take(MAX_TARGET_TYPES)
            .cloned()
            .collect()
    } else {
        requested
    };

    if intent == "aggregate" {
        // a fixed sample per type gives the scorer a cross-section of
        // each population
        for node_type in &types {
            for seed in sample_type(index, store, rng, node_type, &taken, AGGREGATE_SAMPLES_PER_TYPE)
            {
                taken.insert(seed.node_id.clone());
                seeds.push(seed);
            }
        }
        seeds.truncate(needed);
    } else {
        for node_type in &types {
            if seeds.len() >= needed {
                break;
            }
            for seed in sample_type(index, store, rng, node_type, &taken, needed - seeds.len()) {
                taken.insert(seed.node_id.clone());
                seeds.push(seed);
            }
        }
    }

    debug!(
        intent,
        targets = ?types.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        seeds = seeds.len(),
        "fallback seeds resolved"
    );
    seeds
}
