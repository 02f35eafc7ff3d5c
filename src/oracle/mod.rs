//! Reasoning oracle
//!
//! The oracle is the external language model the engine consults for
//! intent classification, semantic candidate scoring, and per-hop
//! traversal decisions. The engine treats every oracle failure as
//! recoverable and never surfaces one to its caller.

pub mod client;
pub mod payload;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{LlmOracle, LlmProvider, OracleConfig};

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("LLM API error: {0}")]
    ApiError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type OracleResult<T> = Result<T, OracleError>;

/// A completion backend the retrieval engine can consult.
///
/// Implementations are expected to be cheap to share (`Arc<dyn
/// ReasoningOracle>`) and safe to call concurrently; the scorer issues
/// several completions at once.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Name used in log events
    fn name(&self) -> &str;

    /// Produce a completion for the prompt
    async fn complete(&self, prompt: &str) -> OracleResult<String>;
}
