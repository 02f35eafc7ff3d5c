use anyhow::Result;
use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use trialgraph::oracle::{OracleError, OracleResult};
use trialgraph::{
    DataCatalog, DataSource, DisabledExecutor, Edge, GraphRetriever, GraphStore, LlmOracle, Node,
    OracleConfig, ReasoningOracle, RetrievalConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("TrialGraph v{}", trialgraph::version());
    println!("==========================================");
    println!();

    let store = Arc::new(demo_graph()?);
    println!(
        "✓ Loaded demo graph: {} nodes, {} edges",
        store.node_count(),
        store.edge_count()
    );
    println!("  {}", store.schema_summary());

    demo_heuristic_retrieval(store.clone()).await?;

    match env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => demo_oracle_retrieval(store, key).await?,
        _ => {
            println!("\n=== Demo 2: Oracle-Guided Retrieval ===");
            println!("Set OPENAI_API_KEY to run the oracle-guided demo.");
        }
    }

    Ok(())
}

fn demo_graph() -> Result<GraphStore> {
    let mut store = GraphStore::new();

    store.add_node(
        Node::new("NCT04538378", "Study")
            .with_attr("title", "adjuvant osimertinib in resected EGFR-mutated NSCLC")
            .with_attr("phase", 3i64)
            .with_attr("status", "recruiting"),
    )?;
    store.add_node(
        Node::new("NCT03778229", "Study")
            .with_attr("title", "first-line osimertinib with chemotherapy")
            .with_attr("phase", 3i64)
            .with_attr("status", "active"),
    )?;

    store.add_node(
        Node::new("SITE-BOS", "Site")
            .with_attr("name", "Boston General")
            .with_attr("country", "US"),
    )?;
    store.add_node(
        Node::new("SITE-SEA", "Site")
            .with_attr("name", "Seattle Cancer Center")
            .with_attr("country", "US"),
    )?;

    store.add_node(
        Node::new("COND-NSCLC", "Condition")
            .with_attr("name", "non-small cell lung cancer")
            .with_attr("description", "EGFR exon 19 deletion or L858R"),
    )?;

    for (i, (age, status)) in [(62i64, "enrolled"), (57, "enrolled"), (70, "screening"), (66, "enrolled")]
        .into_iter()
        .enumerate()
    {
        store.add_node(
            Node::new(format!("SUBJ-{:04}", i + 1), "Subject")
                .with_attr("age", age)
                .with_attr("status", status),
        )?;
    }

    store.add_node(
        Node::new("VISIT-0001-BL", "Visit")
            .with_attr("label", "baseline")
            .with_attr("week", 0i64),
    )?;

    store.add_edge(Edge::new("SITE-BOS", "NCT04538378", "HOSTS"))?;
    store.add_edge(Edge::new("SITE-SEA", "NCT04538378", "HOSTS"))?;
    store.add_edge(Edge::new("SITE-SEA", "NCT03778229", "HOSTS"))?;
    store.add_edge(Edge::new("NCT04538378", "COND-NSCLC", "INVESTIGATES"))?;
    store.add_edge(Edge::new("NCT03778229", "COND-NSCLC", "INVESTIGATES"))?;
    store.add_edge(Edge::new("SUBJ-0001", "NCT04538378", "ENROLLED_IN"))?;
    store.add_edge(Edge::new("SUBJ-0002", "NCT04538378", "ENROLLED_IN"))?;
    store.add_edge(Edge::new("SUBJ-0003", "NCT03778229", "ENROLLED_IN"))?;
    store.add_edge(Edge::new("SUBJ-0004", "NCT03778229", "ENROLLED_IN"))?;
    store.add_edge(Edge::new("SUBJ-0001", "VISIT-0001-BL", "ATTENDED"))?;

    Ok(store)
}

fn demo_catalog() -> DataCatalog {
    DataCatalog::new()
        .add_source(DataSource::new(
            "subjects.csv",
            "per-subject enrollment records",
            vec!["subject_id", "study_id", "site_id", "status", "age"],
        ))
        .with_aggregatable_type("Subject")
}

/// Stand-in oracle for offline runs. Every call fails, which exercises
/// the engine's documented degradations instead of aborting the demo.
struct OfflineOracle;

#[async_trait]
impl ReasoningOracle for OfflineOracle {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _prompt: &str) -> OracleResult<String> {
        Err(OracleError::ConfigError("offline demo".to_string()))
    }
}

async fn demo_heuristic_retrieval(store: Arc<GraphStore>) -> Result<()> {
    println!("\n=== Demo 1: Heuristic Retrieval (offline) ===");

    let config = RetrievalConfig {
        use_semantic_scoring: false,
        use_reasoner_guided_traversal: false,
        n_hops: 2,
        top_k: 5,
        ..RetrievalConfig::default()
    };
    let retriever = GraphRetriever::new(
        store,
        Arc::new(OfflineOracle),
        Arc::new(DisabledExecutor),
        demo_catalog(),
        config,
    )?;

    let query = "which sites host the adjuvant osimertinib study?";
    println!("Query: {}", query);

    let results = retriever.retrieve(query).await;
    println!("✓ Retrieved {} nodes", results.len());
    println!("\n{}", retriever.format_context(&results));

    Ok(())
}

async fn demo_oracle_retrieval(store: Arc<GraphStore>, api_key: String) -> Result<()> {
    println!("\n=== Demo 2: Oracle-Guided Retrieval ===");

    let oracle = LlmOracle::new(&OracleConfig {
        api_key: Some(api_key),
        ..OracleConfig::default()
    })?;
    let retriever = GraphRetriever::new(
        store,
        Arc::new(oracle),
        Arc::new(DisabledExecutor),
        demo_catalog(),
        RetrievalConfig::default(),
    )?;

    let query = "how many subjects are enrolled per study?";
    println!("Query: {}", query);

    let results = retriever.retrieve(query).await;
    println!("✓ Retrieved {} nodes", results.len());
    println!("\n{}", retriever.format_context(&results));

    Ok(())
}
