//! The retrieval engine
//!
//! [`GraphRetriever`] owns the graph, its keyword index, the oracle
//! and executor backends, and the cross-query score cache, and runs
//! the full pipeline for each query.

use crate::exec::{AnalyticExecutor, DataCatalog};
use crate::graph::{GraphStore, NodeId};
use crate::index::NodeIndex;
use crate::oracle::ReasoningOracle;
use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::hop::{HopResult, VisitedSet};
use crate::retrieval::reason::StepDecision;
use crate::retrieval::score::ScoredCandidate;
use crate::retrieval::{
    context, expand, fallback, keyword, prune, reason, score, OracleHandle, QueryStats,
    RetrievalError, RetrievalResult, ORACLE_SELECTED_SCORE,
};
use lru::LruCache;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Graph-guided multi-hop retriever
pub struct GraphRetriever {
    graph: Arc<GraphStore>,
    index: NodeIndex,
    oracle: Arc<dyn ReasoningOracle>,
    executor: Arc<dyn AnalyticExecutor>,
    catalog: DataCatalog,
    config: RetrievalConfig,
    /// Oracle relevance scores survive across queries; scoring the
    /// same node for a second question reuses the cached value
    score_cache: Mutex<LruCache<NodeId, f64>>,
}

impl GraphRetriever {
    /// Build a retriever over a loaded graph. Validates the
    /// configuration and builds the keyword index up front, so a
    /// misconfigured retriever never serves a query.
    pub fn new(
        graph: Arc<GraphStore>,
        oracle: Arc<dyn ReasoningOracle>,
        executor: Arc<dyn AnalyticExecutor>,
        catalog: DataCatalog,
        config: RetrievalConfig,
    ) -> RetrievalResult<Self> {
        config.validate()?;
        let cache_capacity = NonZeroUsize::new(config.oracle_cache_size).ok_or_else(|| {
            RetrievalError::InvalidConfig("oracle_cache_size must be positive".to_string())
        })?;
        let index = NodeIndex::build(&graph);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            tokens = index.token_count(),
            oracle = oracle.name(),
            executor = executor.name(),
            "retrieval engine ready"
        );
        Ok(Self {
            graph,
            index,
            oracle,
            executor,
            catalog,
            config,
            score_cache: Mutex::new(LruCache::new(cache_capacity)),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn graph(&self) -> &GraphStore {
        &self.graph
    }

    /// Retrieve the subgraph relevant to a natural-language question,
    /// using the configured limits.
    pub async fn retrieve(&self, query: &str) -> Vec<HopResult> {
        self.retrieve_with(query, None, None).await
    }

    /// Retrieve with per-query overrides for the seed count and hop
    /// limit. Never fails: every structural problem resolves to an
    /// empty result set.
    pub async fn retrieve_with(
        &self,
        query: &str,
        top_k: Option<usize>,
        n_hops: Option<usize>,
    ) -> Vec<HopResult> {
        let top_k = top_k.unwrap_or(self.config.top_k);
        let n_hops = n_hops.unwrap_or(self.config.n_hops);
        let query_id = Uuid::new_v4();
        let stats = QueryStats::new();
        debug!(%query_id, query, top_k, n_hops, "retrieval started");

        let results = self.run_query(query, top_k, n_hops, &stats).await;

        info!(
            %query_id,
            seeds = stats.seeds.load(Ordering::Relaxed),
            hops = stats.hops.load(Ordering::Relaxed),
            oracle_calls = stats.oracle_calls.load(Ordering::Relaxed),
            cache_hits = stats.cache_hits.load(Ordering::Relaxed),
            candidates_scored = stats.candidates_scored.load(Ordering::Relaxed),
            analytic_attempts = stats.analytic_attempts.load(Ordering::Relaxed),
            elapsed_ms = stats.started.elapsed().as_millis() as u64,
            results = results.len(),
            "retrieval finished"
        );
        results
    }

    /// Render results the way [`format_context`] does. Convenience for
    /// callers that go straight from question to prompt block.
    ///
    /// [`format_context`]: crate::retrieval::format_context
    pub fn format_context(&self, results: &[HopResult]) -> String {
        context::format_context(results)
    }

    async fn run_query(
        &self,
        query: &str,
        top_k: usize,
        n_hops: usize,
        stats: &QueryStats,
    ) -> Vec<HopResult> {
        let oracle = OracleHandle {
            oracle: self.oracle.as_ref(),
            stats,
        };

        let mut seeds = keyword::retrieve_seeds(&self.index, &self.graph, query, top_k);

        if self.config.skip_traversal {
            stats.seeds.store(seeds.len(), Ordering::Relaxed);
            return seeds;
        }

        if seeds.len() < top_k {
            let exclude: FxHashSet<NodeId> = seeds.iter().map(|s| s.node_id.clone()).collect();
            // a spent budget disables the classifier call but not the
            // default-type sampling
            let fallback_oracle = match stats.over_budget(&self.config) {
                None => Some(oracle),
                Some(_) => None,
            };
            let mut rng = StdRng::from_entropy();
            let extra = fallback::resolve_fallback_seeds(
                &self.index,
                &self.graph,
                fallback_oracle,
                &self.config,
                &mut rng,
                query,
                &exclude,
                top_k - seeds.len(),
            )
            .await;
            seeds.extend(extra);
        }

        stats.seeds.store(seeds.len(), Ordering::Relaxed);
        if seeds.is_empty() {
            debug!("no seeds resolved");
            return Vec::new();
        }

        let mut visited = VisitedSet::new();
        let mut layer: Vec<NodeId> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            layer.push(seed.node_id.clone());
            visited.insert(seed);
        }

        let schema = self.graph.schema_summary();
        for _ in 0..n_hops {
            if let Some(budget) = stats.over_budget(&self.config) {
                warn!(budget, "budget exhausted, ending traversal");
                break;
            }

            let pool = expand::expand_layer(&self.graph, &layer, &mut visited);
            if pool.is_empty() {
                debug!(hop = stats.hops.load(Ordering::Relaxed), "frontier exhausted");
                break;
            }
            stats.hops.fetch_add(1, Ordering::Relaxed);
            stats.candidates_scored.fetch_add(pool.len(), Ordering::Relaxed);

            let scored = if self.config.use_semantic_scoring {
                score::semantic_scores(
                    oracle,
                    &self.score_cache,
                    &self.graph,
                    &self.catalog,
                    &self.config,
                    query,
                    pool,
                )
                .await
            } else {
                score::heuristic_scores(&self.config, &self.graph, query, pool)
            };
            let beam = score::select_beam(scored, self.config.beam_width);

            for entry in &beam {
                if let Some(result) = self.beam_result(entry) {
                    visited.insert(result);
                }
            }

            if self.config.use_reasoner_guided_traversal {
                let decision = reason::decide_step(
                    oracle,
                    self.executor.as_ref(),
                    &self.catalog,
                    &self.config,
                    query,
                    &schema,
                    &visited,
                    &beam,
                )
                .await;
                match decision {
                    StepDecision::Traverse(indices) => {
                        layer = indices
                            .iter()
                            .map(|&i| beam[i].candidate.node_id.clone())
                            .collect();
                        for id in &layer {
                            visited.set_similarity(id, ORACLE_SELECTED_SCORE);
                        }
                    }
                    StepDecision::TraverseAll => {
                        layer = beam.iter().map(|e| e.candidate.node_id.clone()).collect();
                    }
                    StepDecision::Stop => break,
                    StepDecision::StopWithAnalytic(text) => {
                        visited.attach_analytic(&text);
                        break;
                    }
                }
            } else {
                layer = beam.iter().map(|e| e.candidate.node_id.clone()).collect();
            }
        }

        if self.config.use_reasoner_guided_traversal {
            // the reasoner already curated the walk; return everything
            // it gathered, in visit order
            visited.into_results()
        } else {
            prune::prune_visited(visited, &self.config, top_k)
        }
    }

    fn beam_result(&self, entry: &ScoredCandidate) -> Option<HopResult> {
        let node = self.graph.get_node(&entry.candidate.node_id)?;
        Some(HopResult {
            node_id: entry.candidate.node_id.clone(),
            node_type: entry.candidate.node_type.clone(),
            attrs: node.attrs.clone(),
            visit_count: entry.candidate.visit_count,
            similarity_score: entry.score,
            hop_path: entry.candidate.hop_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::DisabledExecutor;
    use crate::graph::{Edge, Node, NodeType};
    use crate::oracle::{OracleError, OracleResult};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingOracle {
        calls: AtomicUsize,
    }

    impl CountingOracle {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReasoningOracle for CountingOracle {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _prompt: &str) -> OracleResult<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Err(OracleError::ApiError("not scripted".to_string()))
        }
    }

    fn demo_graph() -> Arc<GraphStore> {
        let mut store = GraphStore::new();
        store
            .add_node(Node::new("NCT-7", "Study").with_attr("title", "adjuvant osimertinib"))
            .unwrap();
        store
            .add_node(Node::new("SITE-BOS", "Site").with_attr("name", "boston general"))
            .unwrap();
        store
            .add_node(Node::new("SUBJ-0001", "Subject").with_attr("status", "enrolled"))
            .unwrap();
        store
            .add_edge(Edge::new("SITE-BOS", "NCT-7", "HOSTS"))
            .unwrap();
        store
            .add_edge(Edge::new("SUBJ-0001", "NCT-7", "ENROLLED_IN"))
            .unwrap();
        Arc::new(store)
    }

    fn heuristic_config() -> RetrievalConfig {
        RetrievalConfig {
            use_semantic_scoring: false,
            use_reasoner_guided_traversal: false,
            top_k: 1,
            n_hops: 2,
            prune_threshold: 0.1,
            // restricting fallback to Study keeps sampled seeds out of
            // the walk these tests assert on
            fallback_types: vec![NodeType::new("Study")],
            ..RetrievalConfig::default()
        }
    }

    fn retriever(config: RetrievalConfig) -> (GraphRetriever, Arc<CountingOracle>) {
        let oracle = Arc::new(CountingOracle::new());
        let retriever = GraphRetriever::new(
            demo_graph(),
            oracle.clone(),
            Arc::new(DisabledExecutor),
            DataCatalog::new(),
            config,
        )
        .unwrap();
        (retriever, oracle)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RetrievalConfig {
            beam_width: 0,
            ..RetrievalConfig::default()
        };
        let result = GraphRetriever::new(
            demo_graph(),
            Arc::new(CountingOracle::new()),
            Arc::new(DisabledExecutor),
            DataCatalog::new(),
            config,
        );
        assert!(matches!(result, Err(RetrievalError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_empty_graph_returns_empty() {
        let retriever = GraphRetriever::new(
            Arc::new(GraphStore::new()),
            Arc::new(CountingOracle::new()),
            Arc::new(DisabledExecutor),
            DataCatalog::new(),
            heuristic_config(),
        )
        .unwrap();
        assert!(retriever.retrieve("anything at all").await.is_empty());
    }

    #[tokio::test]
    async fn test_skip_traversal_makes_no_oracle_calls() {
        let config = RetrievalConfig {
            skip_traversal: true,
            top_k: 10,
            ..RetrievalConfig::default()
        };
        let (retriever, oracle) = retriever(config);

        let results = retriever.retrieve("osimertinib").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_id.as_str(), "NCT-7");
        assert_eq!(oracle.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_heuristic_walk_reaches_neighbors() {
        let (retriever, oracle) = retriever(heuristic_config());

        let results = retriever.retrieve_with("osimertinib", Some(3), None).await;
        let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
        assert!(ids.contains(&"NCT-7"));
        assert!(ids.contains(&"SITE-BOS"));
        assert!(ids.contains(&"SUBJ-0001"));
        // both neighbors arrived by traversal, not by seeding
        for r in results.iter().filter(|r| r.node_id.as_str() != "NCT-7") {
            assert_eq!(r.hop_path.len(), 2);
            assert_eq!(r.hop_path[0].as_str(), "NCT-7");
        }
        // one keyword seed left the top_k short, so the intent
        // classifier was consulted exactly once
        assert_eq!(oracle.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_zero_hops_returns_seeds_only() {
        let (retriever, _) = retriever(heuristic_config());

        let results = retriever.retrieve_with("osimertinib", Some(1), Some(0)).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].node_id.as_str(), "NCT-7");
        assert_eq!(results[0].hop_path, vec![NodeId::new("NCT-7")]);
    }
}
