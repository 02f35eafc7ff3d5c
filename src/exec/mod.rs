//! Analytic execution
//!
//! The reasoner can answer aggregate-style questions by generating a
//! small analytic snippet and running it on an external executor (a
//! sandboxed interpreter over the study's tabular extracts). The
//! engine only sees text in and text out; executor failures feed the
//! repair loop and never reach the caller.

pub mod catalog;

use async_trait::async_trait;
use thiserror::Error;

pub use catalog::{DataCatalog, DataSource};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("analytic execution failed: {0}")]
    Failed(String),
}

pub type ExecResult<T> = Result<T, ExecError>;

/// Executes oracle-generated analytic snippets.
///
/// `run` returns the captured output of the snippet. A failing run
/// returns `ExecError::Failed` carrying the interpreter's error text
/// verbatim, which the reasoner includes in its repair prompts.
#[async_trait]
pub trait AnalyticExecutor: Send + Sync {
    /// Name used in log events
    fn name(&self) -> &str;

    /// Run a snippet and capture its output
    async fn run(&self, snippet: &str) -> ExecResult<String>;
}

/// Executor used when no analytic backend is wired up.
///
/// Succeeds with an error-marked result instead of failing, so the
/// reasoner falls through the relevance check and degrades to
/// traversal on its first attempt rather than burning repair rounds.
pub struct DisabledExecutor;

#[async_trait]
impl AnalyticExecutor for DisabledExecutor {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn run(&self, _snippet: &str) -> ExecResult<String> {
        Ok("error: analytic execution is not configured".to_string())
    }
}

/// Markers that disqualify an analytic result regardless of length
const IRRELEVANT_MARKERS: [&str; 3] = ["error", "empty", "no data"];

/// Minimum length for a result to count as an actual answer
const MIN_RELEVANT_LEN: usize = 10;

/// Whether an analytic result looks like a usable answer.
///
/// Cheap textual heuristic: long enough to carry content and free of
/// the failure markers interpreters and empty frames produce.
pub fn result_is_relevant(result: &str) -> bool {
    let trimmed = result.trim();
    if trimmed.len() < MIN_RELEVANT_LEN {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !IRRELEVANT_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_executor_reports_unavailable() {
        let exec = DisabledExecutor;
        let result = exec.run("print(1)").await.unwrap();
        assert!(!result_is_relevant(&result));
    }

    #[test]
    fn test_relevance_markers() {
        assert!(!result_is_relevant("Error: name 'visits' is not defined"));
        assert!(!result_is_relevant("the frame was empty for this filter"));
        assert!(!result_is_relevant("no data found for SITE-014"));
        assert!(!result_is_relevant("   "));
        assert!(!result_is_relevant("42"));
    }

    #[test]
    fn test_relevant_result_passes() {
        assert!(result_is_relevant(
            "site SITE-014 enrolled 27 subjects across 3 studies"
        ));
    }
}
