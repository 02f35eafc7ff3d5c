//! Node indexing module
//!
//! Provides the inverted keyword index and type index that seed
//! retrieval starts from.

pub mod node_index;

pub use node_index::{indexed_text, node_text, tokenize, NodeIndex, ATTR_KEYS};
