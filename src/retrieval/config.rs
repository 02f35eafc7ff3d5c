//! Retrieval configuration

use crate::graph::NodeType;
use crate::retrieval::{RetrievalError, RetrievalResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tuning surface for the retrieval engine.
///
/// Everything here is a per-engine setting; `retrieve_with` can
/// override `top_k` and `n_hops` per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Maximum traversal rounds after seeding
    pub n_hops: usize,

    /// Seed count and final result cap
    pub top_k: usize,

    /// Scored candidates carried past each hop
    pub beam_width: usize,

    /// Helpfulness floor below which visited nodes are dropped
    /// (reasoner-disabled mode only)
    pub prune_threshold: f64,

    /// Weight of similarity vs. visit frequency in helpfulness
    pub similarity_weight: f64,

    /// Score candidates with the oracle instead of the heuristic
    pub use_semantic_scoring: bool,

    /// Let the step reasoner steer traversal and termination
    pub use_reasoner_guided_traversal: bool,

    /// Keyword-only fast path: seeds are the answer, no oracle at all
    pub skip_traversal: bool,

    /// Oracle call ceiling per query, checked between hops
    pub max_oracle_calls_per_query: usize,

    /// Wall clock ceiling per query, checked between hops
    pub max_wall_clock_seconds: u64,

    /// Candidates per semantic scoring batch
    pub score_batch_size: usize,

    /// Concurrent in-flight score batches
    pub scorer_parallelism: usize,

    /// Repair rounds after a failing analytic snippet
    pub analytic_max_retries: usize,

    /// Entries in the per-node oracle score cache
    pub oracle_cache_size: usize,

    /// Types sampled when the intent fallback gets no usable oracle
    /// answer
    pub fallback_types: Vec<NodeType>,

    /// Additive structural boost per node type for the heuristic
    /// scorer. Bridge types that connect the graph score higher than
    /// container types.
    pub type_boosts: IndexMap<NodeType, f64>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            n_hops: 3,
            top_k: 10,
            beam_width: 8,
            prune_threshold: 0.2,
            similarity_weight: 0.7,
            use_semantic_scoring: true,
            use_reasoner_guided_traversal: true,
            skip_traversal: false,
            max_oracle_calls_per_query: 60,
            max_wall_clock_seconds: 120,
            score_batch_size: 8,
            scorer_parallelism: 4,
            analytic_max_retries: 3,
            oracle_cache_size: 4096,
            fallback_types: default_fallback_types(),
            type_boosts: default_type_boosts(),
        }
    }
}

fn default_fallback_types() -> Vec<NodeType> {
    vec![
        NodeType::new("Study"),
        NodeType::new("Site"),
        NodeType::new("Subject"),
    ]
}

fn default_type_boosts() -> IndexMap<NodeType, f64> {
    let mut boosts = IndexMap::new();
    boosts.insert(NodeType::new("Subject"), 0.2);
    boosts.insert(NodeType::new("Study"), 0.15);
    boosts.insert(NodeType::new("Site"), 0.1);
    boosts.insert(NodeType::new("Visit"), 0.1);
    boosts.insert(NodeType::new("Condition"), 0.05);
    boosts
}

impl RetrievalConfig {
    /// Reject configurations the engine cannot run with. Called at
    /// engine construction so bad settings fail fast, not mid-query.
    pub fn validate(&self) -> RetrievalResult<()> {
        if self.top_k == 0 {
            return Err(RetrievalError::InvalidConfig("top_k must be > 0".into()));
        }
        if self.beam_width == 0 {
            return Err(RetrievalError::InvalidConfig(
                "beam_width must be > 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_weight) {
            return Err(RetrievalError::InvalidConfig(format!(
                "similarity_weight must be in [0, 1], got {}",
                self.similarity_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.prune_threshold) {
            return Err(RetrievalError::InvalidConfig(format!(
                "prune_threshold must be in [0, 1], got {}",
                self.prune_threshold
            )));
        }
        if self.score_batch_size == 0 {
            return Err(RetrievalError::InvalidConfig(
                "score_batch_size must be > 0".into(),
            ));
        }
        if self.scorer_parallelism == 0 {
            return Err(RetrievalError::InvalidConfig(
                "scorer_parallelism must be > 0".into(),
            ));
        }
        if self.oracle_cache_size == 0 {
            return Err(RetrievalError::InvalidConfig(
                "oracle_cache_size must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Boost for a node type, zero when unlisted
    pub fn type_boost(&self, node_type: &NodeType) -> f64 {
        self.type_boosts.get(node_type).copied().unwrap_or(0.0)
    }
}
