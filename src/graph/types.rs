use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The closed set of resource types shown on the architecture graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
	Project,
	Location,
	Collection,
	Engine,
	Assistant,
	Agent,
	ReasoningEngine,
	DataStore,
	Authorization,
	CloudRunService,
}

impl NodeType {
	/// Every type, in swim-lane order.
	pub const ALL: [NodeType; 10] = [
		NodeType::Project,
		NodeType::Location,
		NodeType::Collection,
		NodeType::Engine,
		NodeType::DataStore,
		NodeType::Assistant,
		NodeType::Agent,
		NodeType::Authorization,
		NodeType::ReasoningEngine,
		NodeType::CloudRunService,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			NodeType::Project => "Project",
			NodeType::Location => "Location",
			NodeType::Collection => "Collection",
			NodeType::Engine => "Engine",
			NodeType::Assistant => "Assistant",
			NodeType::Agent => "Agent",
			NodeType::ReasoningEngine => "ReasoningEngine",
			NodeType::DataStore => "DataStore",
			NodeType::Authorization => "Authorization",
			NodeType::CloudRunService => "CloudRunService",
		}
	}
}

impl fmt::Display for NodeType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single discovered resource, keyed by its fully-qualified name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	pub id: String,
	#[serde(rename = "type")]
	pub node_type: NodeType,
	pub label: String,
	/// Raw payload as returned by the API.
	pub data: Value,
}

impl GraphNode {
	/// Builds a node, labelling it with `displayName` when the payload has
	/// one and with the last path segment of `id` otherwise.
	pub fn new(id: impl Into<String>, node_type: NodeType, data: Value) -> Self {
		let id = id.into();
		let label = data
			.get("displayName")
			.and_then(Value::as_str)
			.filter(|s| !s.trim().is_empty())
			.map(str::to_owned)
			.unwrap_or_else(|| last_segment(&id).to_owned());
		Self {
			id,
			node_type,
			label,
			data,
		}
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = label.into();
		self
	}
}

/// A directed containment or reference relationship.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
	pub id: String,
	pub source: String,
	pub target: String,
}

impl GraphEdge {
	/// Edge ids are derived from the endpoints so repeated crawls agree.
	pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
		let (source, target) = (source.into(), target.into());
		Self {
			id: format!("{source}->{target}"),
			source,
			target,
		}
	}
}

/// Node and edge arrays as handed to the traversal engine and the canvas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub edges: Vec<GraphEdge>,
}

impl GraphData {
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}
}

pub fn last_segment(name: &str) -> &str {
	name.rsplit('/').find(|s| !s.is_empty()).unwrap_or(name)
}
