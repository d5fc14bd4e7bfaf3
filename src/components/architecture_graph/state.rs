use std::collections::{HashMap, HashSet};

use crate::graph::classify::{classify_cloud_run, lane};
use crate::graph::{GraphData, Highlight, NodeType};

pub const LANE_WIDTH: f64 = 210.0;
pub const LANE_HEADER: f64 = 44.0;
pub const CARD_WIDTH: f64 = 176.0;
pub const CARD_HEIGHT: f64 = 40.0;
pub const ROW_HEIGHT: f64 = 56.0;
const MARGIN: f64 = 16.0;
const CLICK_SLOP: f64 = 4.0;

/// A node card at its swim-lane position (world coordinates, top-left).
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedNode {
	pub id: String,
	pub label: String,
	pub node_type: NodeType,
	pub badge: Option<&'static str>,
	pub x: f64,
	pub y: f64,
}

impl PlacedNode {
	pub fn contains(&self, gx: f64, gy: f64) -> bool {
		gx >= self.x && gx <= self.x + CARD_WIDTH && gy >= self.y && gy <= self.y + CARD_HEIGHT
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedEdge {
	pub id: String,
	pub from: usize,
	pub to: usize,
	/// Cross reference rather than containment.
	pub reference: bool,
}

/// Fixed swim-lane arrangement: one column per type, cards sorted by id
/// so siblings under the same parent stay together.
pub fn layout(data: &GraphData, visible: Option<&HashSet<String>>) -> (Vec<PlacedNode>, Vec<PlacedEdge>) {
	let mut shown: Vec<_> = data
		.nodes
		.iter()
		.filter(|n| visible.is_none_or(|v| v.contains(&n.id)))
		.collect();
	shown.sort_by(|a, b| lane(a.node_type).cmp(&lane(b.node_type)).then_with(|| a.id.cmp(&b.id)));

	let mut rows = [0usize; NodeType::ALL.len()];
	let nodes: Vec<PlacedNode> = shown
		.into_iter()
		.map(|n| {
			let column = lane(n.node_type);
			let row = rows[column];
			rows[column] += 1;
			let badge = match n.node_type {
				NodeType::CloudRunService => classify_cloud_run(&n.data).badge(),
				_ => None,
			};
			PlacedNode {
				id: n.id.clone(),
				label: n.label.clone(),
				node_type: n.node_type,
				badge,
				x: MARGIN + column as f64 * LANE_WIDTH,
				y: LANE_HEADER + row as f64 * ROW_HEIGHT,
			}
		})
		.collect();

	let position: HashMap<&str, usize> = nodes.iter().enumerate().map(|(i, n)| (n.id.as_str(), i)).collect();
	let edges = data
		.edges
		.iter()
		.filter_map(|e| {
			let (from, to) = (*position.get(e.source.as_str())?, *position.get(e.target.as_str())?);
			Some(PlacedEdge {
				id: e.id.clone(),
				from,
				to,
				reference: matches!(
					nodes[to].node_type,
					NodeType::ReasoningEngine | NodeType::CloudRunService
				),
			})
		})
		.collect();
	(nodes, edges)
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Highlight set plus the fade between highlighted and plain rendering.
#[derive(Clone, Debug, Default)]
pub struct HighlightState {
	pub current: Option<Highlight>,
	/// Kept while fading out after the focus is lost.
	pub previous: Option<Highlight>,
	pub t: f64,
	delay_t: f64,
}

impl HighlightState {
	fn active(&self) -> Option<&Highlight> {
		self.current.as_ref().or(self.previous.as_ref())
	}
}

pub struct ArchitectureGraphState {
	pub nodes: Vec<PlacedNode>,
	pub edges: Vec<PlacedEdge>,
	pub lanes: Vec<NodeType>,
	pub transform: ViewTransform,
	pub pan: PanState,
	pub highlight: HighlightState,
	pub selected: Option<String>,
	pub hovered: Option<String>,
	pub width: f64,
	pub height: f64,
	data: GraphData,
	visible: Option<HashSet<String>>,
}

impl ArchitectureGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			nodes: Vec::new(),
			edges: Vec::new(),
			lanes: Vec::new(),
			transform: ViewTransform { x: 0.0, y: 0.0, k: 1.0 },
			pan: PanState::default(),
			highlight: HighlightState::default(),
			selected: None,
			hovered: None,
			width,
			height,
			data: GraphData::default(),
			visible: None,
		}
	}

	pub fn set_graph(&mut self, data: GraphData) {
		self.data = data;
		self.relayout();
	}

	pub fn set_visible(&mut self, visible: Option<HashSet<String>>) {
		if self.visible != visible {
			self.visible = visible;
			self.relayout();
		}
	}

	fn relayout(&mut self) {
		let (nodes, edges) = layout(&self.data, self.visible.as_ref());
		let mut lanes: Vec<NodeType> = nodes.iter().map(|n| n.node_type).collect();
		lanes.dedup();
		self.nodes = nodes;
		self.edges = edges;
		self.lanes = lanes;
		if self.hovered.as_deref().is_some_and(|h| !self.nodes.iter().any(|n| n.id == h)) {
			self.hovered = None;
		}
	}

	pub fn set_highlight(&mut self, highlight: Option<Highlight>) {
		if self.highlight.current == highlight {
			return;
		}
		let was_active = self.highlight.current.is_some();
		match highlight {
			None => self.highlight.previous = self.highlight.current.take(),
			Some(h) => {
				if !was_active {
					self.highlight.delay_t = 0.0;
				}
				self.highlight.previous = None;
				self.highlight.current = Some(h);
			}
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&PlacedNode> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.nodes.iter().find(|n| n.contains(gx, gy))
	}

	pub fn start_pan(&mut self, x: f64, y: f64) {
		self.pan = PanState {
			active: true,
			moved: false,
			start_x: x,
			start_y: y,
			transform_start_x: self.transform.x,
			transform_start_y: self.transform.y,
		};
	}

	pub fn pan_to(&mut self, x: f64, y: f64) {
		if !self.pan.active {
			return;
		}
		let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
		if dx.abs() > CLICK_SLOP || dy.abs() > CLICK_SLOP {
			self.pan.moved = true;
		}
		self.transform.x = self.pan.transform_start_x + dx;
		self.transform.y = self.pan.transform_start_y + dy;
	}

	/// Ends a pan; returns true when the gesture was a click.
	pub fn end_pan(&mut self) -> bool {
		let click = self.pan.active && !self.pan.moved;
		self.pan.active = false;
		click
	}

	pub fn zoom_at(&mut self, x: f64, y: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(0.2, 4.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn has_active_highlight(&self) -> bool {
		self.highlight.active().is_some()
	}

	pub fn is_node_highlighted(&self, id: &str) -> bool {
		self.highlight.active().is_some_and(|h| h.contains_node(id))
	}

	pub fn is_edge_highlighted(&self, id: &str) -> bool {
		self.highlight.active().is_some_and(|h| h.contains_edge(id))
	}

	pub fn tick(&mut self, dt: f64) {
		let (target, delay, speed) = if self.highlight.current.is_some() {
			(1.0, 0.08, 4.0)
		} else {
			(0.0, 0.0, 3.0)
		};

		if self.highlight.current.is_some() {
			self.highlight.delay_t = (self.highlight.delay_t + dt).min(delay);
			if self.highlight.delay_t >= delay {
				self.highlight.t += (target - self.highlight.t) * (speed * dt).min(1.0);
			}
		} else {
			self.highlight.t += (target - self.highlight.t) * (speed * dt).min(1.0);
			if self.highlight.t < 0.01 {
				self.highlight.t = 0.0;
				self.highlight.previous = None;
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}
