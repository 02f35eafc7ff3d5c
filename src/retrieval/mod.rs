//! Graph-guided multi-hop retrieval
//!
//! The pipeline: keyword seed retrieval (with an oracle-backed intent
//! fallback), then up to `n_hops` rounds of expand / score / beam
//! select, steered either by the step reasoner or by the helpfulness
//! pruner, and finally context formatting.

pub mod config;
pub mod context;
pub mod engine;
pub mod expand;
pub mod fallback;
pub mod hop;
pub mod keyword;
pub mod prune;
pub mod reason;
pub mod score;

use crate::oracle::{OracleResult, ReasoningOracle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

pub use config::RetrievalConfig;
pub use context::{format_context, NO_RESULTS_SENTINEL};
pub use engine::GraphRetriever;
pub use hop::{HopResult, VisitedSet, ANALYTIC_RESULT_KEY};

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;

/// Similarity assigned to seeds sampled by the intent fallback
pub const FALLBACK_SEED_SCORE: f64 = 0.5;

/// Similarity assigned to seeds named literally by id in the query
pub const DIRECT_ID_SCORE: f64 = 1.0;

/// Similarity stamped onto nodes the step reasoner selects to continue
pub const ORACLE_SELECTED_SCORE: f64 = 0.8;

/// Score assigned to candidates whose semantic score batch failed
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Per-query counters and timers. Shared by reference into the scorer's
/// concurrent batch tasks, hence the atomics.
#[derive(Debug)]
pub(crate) struct QueryStats {
    pub started: Instant,
    pub seeds: AtomicUsize,
    pub hops: AtomicUsize,
    pub oracle_calls: AtomicUsize,
    pub cache_hits: AtomicUsize,
    pub candidates_scored: AtomicUsize,
    pub analytic_attempts: AtomicUsize,
}

impl QueryStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            seeds: AtomicUsize::new(0),
            hops: AtomicUsize::new(0),
            oracle_calls: AtomicUsize::new(0),
            cache_hits: AtomicUsize::new(0),
            candidates_scored: AtomicUsize::new(0),
            analytic_attempts: AtomicUsize::new(0),
        }
    }

    /// Which budget, if any, is exhausted. Checked between hops; work
    /// already in flight is never interrupted.
    pub fn over_budget(&self, config: &RetrievalConfig) -> Option<&'static str> {
        if self.oracle_calls.load(Ordering::Relaxed) >= config.max_oracle_calls_per_query {
            return Some("oracle_calls");
        }
        if self.started.elapsed() >= Duration::from_secs(config.max_wall_clock_seconds) {
            return Some("wall_clock");
        }
        None
    }
}

/// Counted view of the oracle for one query. Every completion made
/// through the handle counts against the per-query call budget.
#[derive(Clone, Copy)]
pub(crate) struct OracleHandle<'a> {
    pub oracle: &'a dyn ReasoningOracle,
    pub stats: &'a QueryStats,
}

impl OracleHandle<'_> {
    pub async fn complete(&self, prompt: &str) -> OracleResult<String> {
        self.stats.oracle_calls.fetch_add(1, Ordering::Relaxed);
        self.oracle.complete(prompt).await
    }
}
