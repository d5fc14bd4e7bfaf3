use std::collections::{HashMap, HashSet};

use super::types::{GraphData, GraphEdge, GraphNode};

/// Mutable node/edge store filled by a crawl.
///
/// Nodes and edges are keyed by id; re-inserting an id overwrites the
/// payload in place, keeping its original position so array order follows
/// first discovery.
#[derive(Clone, Debug, Default)]
pub struct GraphModel {
	nodes: Vec<GraphNode>,
	node_index: HashMap<String, usize>,
	edges: Vec<GraphEdge>,
	edge_index: HashMap<String, usize>,
}

impl GraphModel {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn upsert_node(&mut self, node: GraphNode) {
		match self.node_index.get(&node.id) {
			Some(&i) => self.nodes[i] = node,
			None => {
				self.node_index.insert(node.id.clone(), self.nodes.len());
				self.nodes.push(node);
			}
		}
	}

	pub fn upsert_edge(&mut self, edge: GraphEdge) {
		match self.edge_index.get(&edge.id) {
			Some(&i) => self.edges[i] = edge,
			None => {
				self.edge_index.insert(edge.id.clone(), self.edges.len());
				self.edges.push(edge);
			}
		}
	}

	pub fn contains_node(&self, id: &str) -> bool {
		self.node_index.contains_key(id)
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn nodes(&self) -> &[GraphNode] {
		&self.nodes
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Drops edges whose source or target never resolved to a node.
	/// Returns the number of edges removed.
	pub fn prune_dangling_edges(&mut self) -> usize {
		let before = self.edges.len();
		let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		self.edges
			.retain(|e| known.contains(e.source.as_str()) && known.contains(e.target.as_str()));
		if self.edges.len() != before {
			self.edge_index = self
				.edges
				.iter()
				.enumerate()
				.map(|(i, e)| (e.id.clone(), i))
				.collect();
		}
		before - self.edges.len()
	}

	pub fn to_arrays(&self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
		(self.nodes.clone(), self.edges.clone())
	}

	/// Copy of the current state with dangling edges filtered out, safe to
	/// publish while the crawl is still running.
	pub fn snapshot(&self) -> GraphData {
		let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		GraphData {
			nodes: self.nodes.clone(),
			edges: self
				.edges
				.iter()
				.filter(|e| known.contains(e.source.as_str()) && known.contains(e.target.as_str()))
				.cloned()
				.collect(),
		}
	}

	pub fn into_data(mut self) -> GraphData {
		self.prune_dangling_edges();
		GraphData {
			nodes: self.nodes,
			edges: self.edges,
		}
	}
}
