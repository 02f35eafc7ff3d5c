//! Per-hop step reasoning
//!
//! After beam selection the oracle chooses how the walk continues:
//! traverse a subset of the beam, run an analytic snippet, or declare
//! the visited nodes sufficient. Failed snippets go through a bounded
//! repair loop that feeds the full error history back to the oracle.

use crate::exec::{result_is_relevant, AnalyticExecutor, DataCatalog};
use crate::oracle::payload::{extract_code_block, parse_json_object};
use crate::retrieval::config::RetrievalConfig;
use crate::retrieval::hop::VisitedSet;
use crate::retrieval::score::ScoredCandidate;
use crate::retrieval::OracleHandle;
use serde::Deserialize;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// What the reasoner decided for the current hop
#[derive(Debug, Clone, PartialEq)]
pub enum StepDecision {
    /// Continue the walk through these beam indices, in oracle order
    Traverse(Vec<usize>),
    /// Continue the walk through the whole beam
    TraverseAll,
    /// The visited set answers the question as-is
    Stop,
    /// The visited set answers the question together with this
    /// analytic output
    StopWithAnalytic(String),
}

#[derive(Debug, Deserialize)]
struct StepPayload {
    action: String,
    #[serde(default)]
    selection: Vec<usize>,
    #[serde(default)]
    snippet: Option<String>,
}

fn step_prompt(
    query: &str,
    schema: &str,
    catalog: &DataCatalog,
    visited: &VisitedSet,
    beam: &[ScoredCandidate],
) -> String {
    let path = visited
        .results()
        .last()
        .map(|r| {
            r.hop_path
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .unwrap_or_else(|| "(none)".to_string());
    let beam_listing = beam
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{}. id={} type={} score={:.2}",
                i, entry.candidate.node_id, entry.candidate.node_type, entry.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are steering a multi-hop walk over a clinical-study knowledge graph.\n\
         \n\
         Question: {}\n\
         \n\
         Graph schema: {}\n\
         \n\
         Path so far: {} ({} nodes visited)\n\
         \n\
         Current beam:\n{}\n\
         \n\
         Analytic data sources:\n{}\n\
         \n\
         Pick one action:\n\
         - \"traverse\": walk further through beam entries; put their indices in \"selection\"\n\
         - \"code\": the answer needs computation over a data source; put a python snippet in \"snippet\"\n\
         - \"sufficient\": the visited nodes already answer the question\n\
         \n\
         Respond with only JSON: {{\"action\": \"traverse\" | \"code\" | \"sufficient\", \
         \"selection\": [<index>, ...], \"snippet\": \"<code or omit>\"}}",
        query,
        schema,
        path,
        visited.len(),
        beam_listing,
        catalog.summary()
    )
}

fn repair_prompt(query: &str, snippet: &str, history: &[String], catalog: &DataCatalog) -> String {
    let errors = history
        .iter()
        .enumerate()
        .map(|(i, err)| format!("{}. {}", i + 1, err))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The analytic snippet below failed. Fix it and respond with only the corrected \
         code in a fenced block.\n\
         \n\
         Question: {}\n\
         \n\
         Analytic data sources:\n{}\n\
         \n\
         Snippet:\n```python\n{}\n```\n\
         \n\
         Errors so far:\n{}",
        query,
        catalog.summary(),
        snippet,
        errors
    )
}

async fn run_analytic(
    oracle: OracleHandle<'_>,
    executor: &dyn AnalyticExecutor,
    catalog: &DataCatalog,
    config: &RetrievalConfig,
    query: &str,
    first_snippet: String,
) -> StepDecision {
    let mut snippet = first_snippet;
    let mut history: Vec<String> = Vec::new();
    loop {
        oracle.stats.analytic_attempts.fetch_add(1, Ordering::Relaxed);
        match executor.run(&snippet).await {
            Ok(output) if result_is_relevant(&output) => {
                debug!(attempts = history.len() + 1, "analytic result accepted");
                return StepDecision::StopWithAnalytic(output);
            }
            Ok(output) => {
                warn!(output = %output, "analytic result not usable, resuming traversal");
                return StepDecision::TraverseAll;
            }
            Err(err) => history.push(err.to_string()),
        }
        if history.len() > config.analytic_max_retries {
            warn!(
                attempts = history.len(),
                "analytic repair budget exhausted, resuming traversal"
            );
            return StepDecision::TraverseAll;
        }
        let response = match oracle
            .complete(&repair_prompt(query, &snippet, &history, catalog))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "snippet repair failed, stopping traversal");
                return StepDecision::Stop;
            }
        };
        let fixed = extract_code_block(&response);
        if fixed.trim().is_empty() {
            warn!("snippet repair produced no code, resuming traversal");
            return StepDecision::TraverseAll;
        }
        snippet = fixed;
    }
}

/// Ask the oracle how to continue from the current beam. Every oracle
/// problem resolves to [`StepDecision::Stop`], so a broken model ends
/// the walk with what has been gathered instead of raising.
#[allow(clippy::too_many_arguments)]
pub async fn decide_step(
    oracle: OracleHandle<'_>,
    executor: &dyn AnalyticExecutor,
    catalog: &DataCatalog,
    config: &RetrievalConfig,
    query: &str,
    schema: &str,
    visited: &VisitedSet,
    beam: &[ScoredCandidate],
) -> StepDecision {
    let prompt = step_prompt(query, schema, catalog, visited, beam);
    let response = match oracle.complete(&prompt).await {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "step reasoner failed, stopping traversal");
            return StepDecision::Stop;
        }
    };
    let payload: StepPayload = match parse_json_object(&response) {
        Some(payload) => payload,
        None => {
            warn!("unparsable step decision, stopping traversal");
            return StepDecision::Stop;
        }
    };

    match payload.action.as_str() {
        "traverse" => {
            let mut indices: Vec<usize> = Vec::new();
            for idx in payload.selection {
                if idx < beam.len() {
                    if !indices.contains(&idx) {
                        indices.push(idx);
                    }
                } else {
                    warn!(index = idx, beam = beam.len(), "selection index out of range, dropped");
                }
            }
            if indices.is_empty() {
                debug!("empty traverse selection, stopping traversal");
                StepDecision::Stop
            } else {
                StepDecision::Traverse(indices)
            }
        }
        "code" => match payload.snippet {
            Some(snippet) if !snippet.trim().is_empty() => {
                run_analytic(oracle, executor, catalog, config, query, snippet).await
            }
            _ => {
                warn!("code action without a snippet, stopping traversal");
                StepDecision::Stop
            }
        },
        "sufficient" => StepDecision::Stop,
        other => {
            warn!(action = other, "unknown step action, stopping traversal");
            StepDecision::Stop
        }
    }
}
