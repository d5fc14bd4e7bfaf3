//! Graph model and traversal for crawled resources.

pub mod classify;
mod model;
mod traversal;
mod types;

pub use model::GraphModel;
pub use traversal::{AdjacencyIndex, Highlight, apply_type_filter, search_matches};
pub use types::{GraphData, GraphEdge, GraphNode, NodeType, last_segment};
