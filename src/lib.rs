//! TrialGraph
//!
//! Graph-guided multi-hop retrieval over a clinical-study knowledge
//! graph. Natural-language questions are answered by walking an
//! entity-relationship graph: keyword matching picks seed nodes, a
//! beam-pruned traversal expands them hop by hop, and an external
//! reasoning oracle steers each hop, optionally handing computation
//! off to an analytic executor. The surviving subgraph is rendered as
//! a context block for a downstream answerer.
//!
//! # Pipeline
//!
//! 1. Keyword seed retrieval over an inverted index of node ids and
//!    key attributes, with an oracle-backed intent fallback when the
//!    keywords come up short.
//! 2. Up to `n_hops` rounds of neighbor expansion, candidate scoring
//!    (heuristic or oracle-batched), and beam selection.
//! 3. A per-hop step decision: traverse deeper, run an analytic
//!    snippet through a bounded repair loop, or stop.
//! 4. Helpfulness pruning and context formatting.
//!
//! # Example Usage
//!
//! ```rust
//! use trialgraph::graph::{Edge, GraphStore, Node};
//!
//! let mut store = GraphStore::new();
//!
//! store
//!     .add_node(Node::new("NCT04538378", "Study").with_attr("title", "adjuvant osimertinib"))
//!     .unwrap();
//! store
//!     .add_node(Node::new("SITE-BOS", "Site").with_attr("name", "Boston General"))
//!     .unwrap();
//! store
//!     .add_edge(Edge::new("SITE-BOS", "NCT04538378", "HOSTS"))
//!     .unwrap();
//!
//! assert_eq!(store.node_count(), 2);
//! assert_eq!(store.outgoing_edges(&"SITE-BOS".into()).len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod exec;
pub mod graph;
pub mod index;
pub mod oracle;
pub mod retrieval;

// Re-export main types for convenience
pub use graph::{
    AttrMap, AttrValue, Edge, EdgeType, GraphError, GraphResult, GraphStore, Node, NodeId,
    NodeType,
};

pub use index::{tokenize, NodeIndex};

pub use oracle::{
    LlmOracle, LlmProvider, OracleConfig, OracleError, OracleResult, ReasoningOracle,
};

pub use exec::{
    AnalyticExecutor, DataCatalog, DataSource, DisabledExecutor, ExecError, ExecResult,
};

pub use retrieval::{
    format_context, GraphRetriever, HopResult, RetrievalConfig, RetrievalError, RetrievalResult,
    VisitedSet, ANALYTIC_RESULT_KEY, NO_RESULTS_SENTINEL,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
        assert_eq!(ver, "0.1.0");
    }
}
