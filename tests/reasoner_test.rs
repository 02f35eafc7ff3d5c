use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use trialgraph::exec::{AnalyticExecutor, DisabledExecutor, ExecError, ExecResult};
use trialgraph::graph::{AttrValue, Edge, GraphStore, Node};
use trialgraph::oracle::{OracleError, OracleResult, ReasoningOracle};
use trialgraph::{DataCatalog, GraphRetriever, RetrievalConfig, ANALYTIC_RESULT_KEY};

struct ScriptedOracle {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _prompt: &str) -> OracleResult<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OracleError::ApiError("script exhausted".to_string()))
    }
}

struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<ExecResult<String>>>,
    runs: AtomicUsize,
}

impl ScriptedExecutor {
    fn new(outcomes: Vec<ExecResult<String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            runs: AtomicUsize::new(0),
        }
    }

    fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl AnalyticExecutor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, _snippet: &str) -> ExecResult<String> {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExecError::Failed("script exhausted".to_string())))
    }
}

fn reasoner_config() -> RetrievalConfig {
    RetrievalConfig {
        use_semantic_scoring: false,
        use_reasoner_guided_traversal: true,
        top_k: 1,
        n_hops: 2,
        fallback_types: vec![],
        ..RetrievalConfig::default()
    }
}

/// A (Site) -> B (Study) -> C (Subject)
fn chain_store() -> Arc<GraphStore> {
    let mut store = GraphStore::new();
    store.add_node(Node::new("A", "Site")).unwrap();
    store.add_node(Node::new("B", "Study")).unwrap();
    store.add_node(Node::new("C", "Subject")).unwrap();
    store.add_edge(Edge::new("A", "B", "HOSTS")).unwrap();
    store.add_edge(Edge::new("B", "C", "ENROLLS")).unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn test_beam_index_selection_drives_next_layer() {
    // HUB hosts X, Y, Z; each child enrolls its own subject
    let mut store = GraphStore::new();
    store.add_node(Node::new("HUB", "Study")).unwrap();
    for child in ["X", "Y", "Z"] {
        store.add_node(Node::new(child, "Site")).unwrap();
        store.add_edge(Edge::new("HUB", child, "HOSTS")).unwrap();
        let grandchild = format!("G{}", child);
        store
            .add_node(Node::new(grandchild.clone(), "Subject"))
            .unwrap();
        store
            .add_edge(Edge::new(child, grandchild, "ENROLLS"))
            .unwrap();
    }

    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "traverse", "selection": [0, 2]}"#,
        r#"{"action": "sufficient"}"#,
    ]));
    let engine = GraphRetriever::new(
        Arc::new(store),
        oracle.clone(),
        Arc::new(DisabledExecutor),
        DataCatalog::new(),
        reasoner_config(),
    )
    .unwrap();

    let results = engine.retrieve("HUB").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    // Y stays in the visited set but was not traversed, so GY is absent
    assert_eq!(ids, vec!["HUB", "X", "Y", "Z", "GX", "GZ"]);

    let find = |id: &str| results.iter().find(|r| r.node_id.as_str() == id).unwrap();
    // selected entries carry the reasoner's confidence
    assert_eq!(find("X").similarity_score, 0.8);
    assert_eq!(find("Z").similarity_score, 0.8);
    // the unselected sibling keeps its heuristic score
    assert_eq!(find("Y").similarity_score, 0.1);

    let path: Vec<&str> = find("GX").hop_path.iter().map(|id| id.as_str()).collect();
    assert_eq!(path, vec!["HUB", "X", "GX"]);
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_analytic_repair_recovers_and_attaches_result() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "code", "snippet": "df.coun()"}"#,
        "```python\ndf.count(\n```",
        "```python\ndf.count()\n```",
    ]));
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Err(ExecError::Failed("AttributeError: coun".to_string())),
        Err(ExecError::Failed("SyntaxError: unexpected EOF".to_string())),
        Ok("487 subjects enrolled at 12 sites".to_string()),
    ]));
    let engine = GraphRetriever::new(
        chain_store(),
        oracle.clone(),
        executor.clone(),
        DataCatalog::new(),
        RetrievalConfig {
            n_hops: 1,
            ..reasoner_config()
        },
    )
    .unwrap();

    let results = engine.retrieve("A").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);

    // the analytic output lands on the last node of the walk
    assert_eq!(
        results[1].attrs.get(ANALYTIC_RESULT_KEY),
        Some(&AttrValue::String(
            "487 subjects enrolled at 12 sites".to_string()
        ))
    );
    assert!(results[0].attrs.get(ANALYTIC_RESULT_KEY).is_none());
    assert_eq!(executor.runs(), 3);
    // one step decision plus two repairs
    assert_eq!(oracle.calls(), 3);
}

#[tokio::test]
async fn test_analytic_retry_ceiling_resumes_walk() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "code", "snippet": "broken()"}"#,
        "```python\nstill_broken()\n```",
        "```python\nstill_broken()\n```",
        "```python\nstill_broken()\n```",
        r#"{"action": "sufficient"}"#,
    ]));
    let executor = Arc::new(ScriptedExecutor::new(vec![
        Err(ExecError::Failed("err 1".to_string())),
        Err(ExecError::Failed("err 2".to_string())),
        Err(ExecError::Failed("err 3".to_string())),
        Err(ExecError::Failed("err 4".to_string())),
    ]));
    let engine = GraphRetriever::new(
        chain_store(),
        oracle.clone(),
        executor.clone(),
        DataCatalog::new(),
        reasoner_config(),
    )
    .unwrap();

    let results = engine.retrieve("A").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    // the exhausted repair loop fell back to traversing the beam, so
    // the walk still reached C before the scripted "sufficient"
    assert_eq!(ids, vec!["A", "B", "C"]);
    for r in &results {
        assert!(r.attrs.get(ANALYTIC_RESULT_KEY).is_none());
    }
    assert_eq!(executor.runs(), 4);
    assert_eq!(oracle.calls(), 5);
}

#[tokio::test]
async fn test_step_oracle_failure_keeps_gathered_nodes() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "traverse", "selection": [0]}"#,
    ]));
    let engine = GraphRetriever::new(
        chain_store(),
        oracle.clone(),
        Arc::new(DisabledExecutor),
        DataCatalog::new(),
        reasoner_config(),
    )
    .unwrap();

    let results = engine.retrieve("A").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    // hop 2's beam was already recorded when the script ran out
    assert_eq!(ids, vec!["A", "B", "C"]);

    let find = |id: &str| results.iter().find(|r| r.node_id.as_str() == id).unwrap();
    assert_eq!(find("B").similarity_score, 0.8);
    assert_eq!(find("C").similarity_score, 0.2);
    assert_eq!(oracle.calls(), 2);
}

#[tokio::test]
async fn test_irrelevant_analytic_result_resumes_walk() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "code", "snippet": "df.filter(...)"}"#,
        r#"{"action": "sufficient"}"#,
    ]));
    let executor = Arc::new(ScriptedExecutor::new(vec![Ok("empty".to_string())]));
    let engine = GraphRetriever::new(
        chain_store(),
        oracle.clone(),
        executor.clone(),
        DataCatalog::new(),
        reasoner_config(),
    )
    .unwrap();

    let results = engine.retrieve("A").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    for r in &results {
        assert!(r.attrs.get(ANALYTIC_RESULT_KEY).is_none());
    }
    assert_eq!(executor.runs(), 1);
}

#[tokio::test]
async fn test_disabled_executor_degrades_without_repairs() {
    let oracle = Arc::new(ScriptedOracle::new(vec![
        r#"{"action": "code", "snippet": "df.count()"}"#,
        r#"{"action": "sufficient"}"#,
    ]));
    let engine = GraphRetriever::new(
        chain_store(),
        oracle.clone(),
        Arc::new(DisabledExecutor),
        DataCatalog::new(),
        reasoner_config(),
    )
    .unwrap();

    let results = engine.retrieve("A").await;
    let ids: Vec<&str> = results.iter().map(|r| r.node_id.as_str()).collect();
    // the disabled executor's marker output reads as irrelevant, so
    // the walk resumed instead of burning repair rounds
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(oracle.calls(), 2);
}
