//! Analytic data source catalog

use crate::graph::NodeType;
use serde::{Deserialize, Serialize};

/// One tabular extract the analytic executor can load by name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    pub description: String,
    pub columns: Vec<String>,
}

impl DataSource {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        columns: Vec<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            columns: columns.into_iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Catalog of analytic data sources, rendered into scorer and reasoner
/// prompts so the oracle knows what a CODE action can work with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataCatalog {
    sources: Vec<DataSource>,

    /// Node types whose records exist as rows in some source, i.e.
    /// types a CODE action can aggregate over
    aggregatable_types: Vec<NodeType>,
}

impl DataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, source: DataSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_aggregatable_type(mut self, node_type: impl Into<NodeType>) -> Self {
        self.aggregatable_types.push(node_type.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn is_aggregatable(&self, node_type: &NodeType) -> bool {
        self.aggregatable_types.contains(node_type)
    }

    /// Render the catalog for a prompt, one line per source
    pub fn summary(&self) -> String {
        if self.sources.is_empty() {
            return "no analytic data sources available".to_string();
        }
        self.sources
            .iter()
            .map(|s| {
                format!(
                    "- {} [{}]: {}",
                    s.name,
                    s.columns.join(", "),
                    s.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
