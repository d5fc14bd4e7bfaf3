//! Session state for the console: what is being scanned, the latest
//! result, and how the operator is interacting with it.

use std::collections::HashSet;

use crate::crawl::{ScanGeneration, ScanOutcome, ScanTicket};
use crate::graph::{AdjacencyIndex, GraphData, Highlight, NodeType, apply_type_filter};

/// Hover and selection. The two are independent; an active selection
/// suppresses the hover highlight.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Interaction {
	pub hovered: Option<String>,
	pub selected: Option<String>,
}

impl Interaction {
	pub fn hover(&mut self, node: Option<String>) {
		self.hovered = node;
	}

	/// Selects `node`, or deselects it when it is already selected.
	pub fn click(&mut self, node: &str) {
		if self.selected.as_deref() == Some(node) {
			self.selected = None;
		} else {
			self.selected = Some(node.to_owned());
		}
	}

	pub fn clear_selection(&mut self) {
		self.selected = None;
	}

	/// Node whose lineage should be highlighted, if any.
	pub fn highlight_focus(&self) -> Option<&str> {
		match self.selected {
			Some(_) => None,
			None => self.hovered.as_deref(),
		}
	}
}

/// The graph of the last scan together with its traversal index.
#[derive(Clone, Debug, Default)]
pub struct IndexedGraph {
	pub data: GraphData,
	pub index: AdjacencyIndex,
}

// the index is derived from `data`
impl PartialEq for IndexedGraph {
	fn eq(&self, other: &Self) -> bool {
		self.data == other.data
	}
}

impl IndexedGraph {
	pub fn new(data: GraphData) -> Self {
		let index = AdjacencyIndex::build(&data.nodes, &data.edges);
		Self { data, index }
	}

	pub fn highlight(&self, interaction: &Interaction) -> Option<Highlight> {
		interaction
			.highlight_focus()
			.map(|focus| self.index.compute_highlight(focus))
	}

	pub fn visible(
		&self,
		interaction: &Interaction,
		search: &str,
		hidden: &HashSet<NodeType>,
	) -> Option<HashSet<String>> {
		let visible = self.index.compute_visible(
			interaction.selected.as_deref(),
			Some(search),
			&self.data.nodes,
		);
		apply_type_filter(visible, &self.data.nodes, hidden)
	}
}

/// Everything the console remembers between tab switches.
///
/// Created on app start; changing project drops the cached scan, and
/// [`Session::reset`] drops the token as well.
#[derive(Clone, Debug, Default)]
pub struct Session {
	pub project: String,
	pub access_token: String,
	pub last_scan: Option<ScanOutcome>,
	pub interaction: Interaction,
	pub search: String,
	pub hidden_types: HashSet<NodeType>,
	generation: ScanGeneration,
}

impl Session {
	pub fn new() -> Self {
		Self::default()
	}

	/// Updates the project input. Returns true when the project actually
	/// changed, in which case the cached scan and any scan in flight are
	/// dropped.
	pub fn set_project(&mut self, project: impl Into<String>) -> bool {
		let project = project.into();
		if project.trim() == self.project.trim() {
			self.project = project;
			return false;
		}
		self.project = project;
		self.generation.cancel();
		self.last_scan = None;
		self.interaction = Interaction::default();
		self.search.clear();
		true
	}

	pub fn reset(&mut self) {
		self.generation.cancel();
		*self = Self {
			generation: self.generation.clone(),
			..Self::default()
		};
	}

	/// Starts a scan, superseding any in flight. Interaction state belongs
	/// to the old graph and is dropped.
	pub fn begin_scan(&mut self) -> ScanTicket {
		self.interaction = Interaction::default();
		self.generation.begin()
	}

	/// Stores a finished scan unless a newer one has started since.
	pub fn finish_scan(&mut self, ticket: &ScanTicket, outcome: ScanOutcome) -> bool {
		if !ticket.is_current() || outcome.is_superseded() {
			return false;
		}
		self.last_scan = Some(outcome);
		true
	}

	pub fn toggle_type(&mut self, node_type: NodeType) {
		if !self.hidden_types.remove(&node_type) {
			self.hidden_types.insert(node_type);
		}
	}
}
