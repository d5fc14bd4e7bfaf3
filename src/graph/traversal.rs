//! Lineage queries over the crawled graph.
//!
//! Both walks are visited-set BFS, so unexpected cycles or repeated parents
//! cannot loop. Indexes are rebuilt whenever a new edge set arrives.

use std::collections::{HashMap, HashSet, VecDeque};

use super::types::{GraphEdge, GraphNode, NodeType};

/// Nodes and edges lit up for a focus node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Highlight {
	pub node_ids: HashSet<String>,
	pub edge_ids: HashSet<String>,
}

impl Highlight {
	pub fn contains_node(&self, id: &str) -> bool {
		self.node_ids.contains(id)
	}

	pub fn contains_edge(&self, id: &str) -> bool {
		self.edge_ids.contains(id)
	}
}

#[derive(Clone, Copy)]
enum Direction {
	Up,
	Down,
}

/// Forward and reverse adjacency over an edge set.
#[derive(Clone, Debug, Default)]
pub struct AdjacencyIndex {
	edges_by_source: HashMap<String, Vec<GraphEdge>>,
	edges_by_target: HashMap<String, Vec<GraphEdge>>,
	node_ids: HashSet<String>,
}

impl AdjacencyIndex {
	pub fn build(nodes: &[GraphNode], edges: &[GraphEdge]) -> Self {
		let mut index = Self {
			node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
			..Self::default()
		};
		for edge in edges {
			index
				.edges_by_source
				.entry(edge.source.clone())
				.or_default()
				.push(edge.clone());
			index
				.edges_by_target
				.entry(edge.target.clone())
				.or_default()
				.push(edge.clone());
		}
		index
	}

	pub fn children(&self, id: &str) -> &[GraphEdge] {
		self.edges_by_source.get(id).map_or(&[], Vec::as_slice)
	}

	pub fn parents(&self, id: &str) -> &[GraphEdge] {
		self.edges_by_target.get(id).map_or(&[], Vec::as_slice)
	}

	fn walk(&self, start: &str, direction: Direction, out: &mut Highlight) {
		let mut visited = HashSet::from([start.to_owned()]);
		let mut queue = VecDeque::from([start.to_owned()]);
		while let Some(current) = queue.pop_front() {
			let edges = match direction {
				Direction::Up => self.parents(&current),
				Direction::Down => self.children(&current),
			};
			for edge in edges {
				out.edge_ids.insert(edge.id.clone());
				let next = match direction {
					Direction::Up => &edge.source,
					Direction::Down => &edge.target,
				};
				if visited.insert(next.clone()) {
					out.node_ids.insert(next.clone());
					queue.push_back(next.clone());
				}
			}
		}
	}

	/// Focus node plus every ancestor and descendant, with the edges walked
	/// to reach them. Unknown ids produce an empty highlight.
	pub fn compute_highlight(&self, focus: &str) -> Highlight {
		let mut highlight = Highlight::default();
		if !self.node_ids.contains(focus) {
			return highlight;
		}
		highlight.node_ids.insert(focus.to_owned());
		self.walk(focus, Direction::Up, &mut highlight);
		self.walk(focus, Direction::Down, &mut highlight);
		highlight
	}

	/// Node filter for the canvas.
	///
	/// A non-blank search term wins and yields exactly the nodes whose label,
	/// id or type contains it (case-insensitive). Otherwise a selection yields
	/// its full lineage. `None` means "show everything", which is also the
	/// answer for a selection the graph no longer contains.
	pub fn compute_visible(
		&self,
		selected: Option<&str>,
		search: Option<&str>,
		nodes: &[GraphNode],
	) -> Option<HashSet<String>> {
		if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
			return Some(search_matches(term, nodes));
		}
		selected
			.filter(|id| self.node_ids.contains(*id))
			.map(|id| self.compute_highlight(id).node_ids)
	}
}

pub fn search_matches(term: &str, nodes: &[GraphNode]) -> HashSet<String> {
	let needle = term.to_lowercase();
	nodes
		.iter()
		.filter(|n| {
			n.label.to_lowercase().contains(&needle)
				|| n.id.to_lowercase().contains(&needle)
				|| n.node_type.as_str().to_lowercase().contains(&needle)
		})
		.map(|n| n.id.clone())
		.collect()
}

/// Narrows a visible set by removing hidden resource types.
pub fn apply_type_filter(
	visible: Option<HashSet<String>>,
	nodes: &[GraphNode],
	hidden: &HashSet<NodeType>,
) -> Option<HashSet<String>> {
	if hidden.is_empty() {
		return visible;
	}
	Some(
		nodes
			.iter()
			.filter(|n| !hidden.contains(&n.node_type))
			.filter(|n| visible.as_ref().is_none_or(|v| v.contains(&n.id)))
			.map(|n| n.id.clone())
			.collect(),
	)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::Value;

	use super::*;

	fn node(id: &str, node_type: NodeType) -> GraphNode {
		GraphNode::new(id, node_type, Value::Null)
	}

	fn ids(items: &[&str]) -> HashSet<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	/// A->B->C, A->D
	fn sample() -> (Vec<GraphNode>, Vec<GraphEdge>) {
		let nodes = vec![
			node("A", NodeType::Project),
			node("B", NodeType::Location),
			node("C", NodeType::Collection),
			node("D", NodeType::Authorization),
		];
		let edges = vec![
			GraphEdge::between("A", "B"),
			GraphEdge::between("B", "C"),
			GraphEdge::between("A", "D"),
		];
		(nodes, edges)
	}

	#[test]
	fn highlight_follows_lineage_only() {
		let (nodes, edges) = sample();
		let index = AdjacencyIndex::build(&nodes, &edges);

		let h = index.compute_highlight("B");
		assert_eq!(h.node_ids, ids(&["A", "B", "C"]));
		assert_eq!(h.edge_ids, ids(&["A->B", "B->C"]));

		assert_eq!(index.compute_highlight("A").node_ids, ids(&["A", "B", "C", "D"]));
	}

	#[test]
	fn highlight_terminates_on_cycle() {
		let nodes = vec![node("X", NodeType::Agent), node("Y", NodeType::ReasoningEngine)];
		let edges = vec![GraphEdge::between("X", "Y"), GraphEdge::between("Y", "X")];
		let index = AdjacencyIndex::build(&nodes, &edges);

		let h = index.compute_highlight("X");
		assert_eq!(h.node_ids, ids(&["X", "Y"]));
		assert_eq!(h.edge_ids, ids(&["X->Y", "Y->X"]));
	}

	#[test]
	fn highlight_of_unknown_node_is_empty() {
		let (nodes, edges) = sample();
		let index = AdjacencyIndex::build(&nodes, &edges);
		assert_eq!(index.compute_highlight("nope"), Highlight::default());
	}

	#[test]
	fn diamond_is_visited_once() {
		let nodes = vec![
			node("A", NodeType::Project),
			node("B", NodeType::Location),
			node("C", NodeType::Location),
			node("D", NodeType::Collection),
		];
		let edges = vec![
			GraphEdge::between("A", "B"),
			GraphEdge::between("A", "C"),
			GraphEdge::between("B", "D"),
			GraphEdge::between("C", "D"),
		];
		let index = AdjacencyIndex::build(&nodes, &edges);
		let h = index.compute_highlight("D");
		assert_eq!(h.node_ids, ids(&["A", "B", "C", "D"]));
		assert_eq!(h.edge_ids.len(), 4);
	}

	#[test]
	fn search_takes_precedence_over_selection() {
		let (nodes, edges) = sample();
		let index = AdjacencyIndex::build(&nodes, &edges);

		let visible = index.compute_visible(Some("B"), Some("authorization"), &nodes);
		assert_eq!(visible, Some(ids(&["D"])));
	}

	#[test]
	fn selection_yields_closure() {
		let (nodes, edges) = sample();
		let index = AdjacencyIndex::build(&nodes, &edges);

		assert_eq!(index.compute_visible(Some("C"), None, &nodes), Some(ids(&["A", "B", "C"])));
		assert_eq!(index.compute_visible(Some("C"), Some("   "), &nodes), Some(ids(&["A", "B", "C"])));
	}

	#[test]
	fn no_filter_means_show_all() {
		let (nodes, edges) = sample();
		let index = AdjacencyIndex::build(&nodes, &edges);
		assert_eq!(index.compute_visible(None, None, &nodes), None);
		assert_eq!(index.compute_visible(Some("gone"), None, &nodes), None);
		assert_eq!(index.compute_visible(Some("gone"), Some("D"), &nodes), Some(ids(&["D"])));
	}

	#[test]
	fn search_matches_label_id_and_type() {
		let nodes = vec![
			node("projects/p/locations/global", NodeType::Location).with_label("Global"),
			node("projects/p/locations/us-central1/services/a2a-proxy", NodeType::CloudRunService),
		];
		assert_eq!(search_matches("GLOB", &nodes), ids(&["projects/p/locations/global"]));
		assert_eq!(search_matches("cloudrun", &nodes).len(), 1);
		assert_eq!(search_matches("projects/p", &nodes).len(), 2);
	}

	#[test]
	fn type_filter_intersects_visible_set() {
		let (nodes, _) = sample();
		let hidden = HashSet::from([NodeType::Location]);

		assert_eq!(apply_type_filter(None, &nodes, &HashSet::new()), None);
		assert_eq!(apply_type_filter(None, &nodes, &hidden), Some(ids(&["A", "C", "D"])));
		assert_eq!(
			apply_type_filter(Some(ids(&["A", "B"])), &nodes, &hidden),
			Some(ids(&["A"]))
		);
	}
}
