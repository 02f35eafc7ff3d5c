//! Study graph data model
//!
//! A directed, attributed multigraph:
//! - Typed nodes with flat attribute maps
//! - Directed edges with types and attributes
//! - Multiple edges between the same pair of nodes
//! - In-memory storage with adjacency lists and a type index
//!
//! Node iteration follows insertion order so everything built on top of
//! the store (keyword index, tie-breaking, sampling) is deterministic
//! for a given load.

pub mod attrs;
pub mod edge;
pub mod node;
pub mod store;
pub mod types;

// Re-export main types
pub use attrs::{AttrMap, AttrValue};
pub use edge::Edge;
pub use node::Node;
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeType, NodeId, NodeType};
