//! Per-type lookup tables and the Cloud Run hosting heuristic.

use serde::Serialize;
use serde_json::Value;

use super::types::{GraphNode, NodeType};

/// Best-effort guess at what a Cloud Run service hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudRunKind {
	Generic,
	A2a,
	McpCandidate,
}

impl CloudRunKind {
	pub fn badge(self) -> Option<&'static str> {
		match self {
			CloudRunKind::Generic => None,
			CloudRunKind::A2a => Some("A2A"),
			CloudRunKind::McpCandidate => Some("MCP"),
		}
	}

	pub fn is_agent_hosting(self) -> bool {
		!matches!(self, CloudRunKind::Generic)
	}
}

const AGENT_ENV_VARS: &[&str] = &["AGENT_URL", "PROVIDER_ORGANIZATION"];

/// Environment variables declared on the service's containers, as
/// `(name, value)` pairs. Handles both the v2 (`template.containers`) and
/// v1 (`spec.template.spec.containers`) payload shapes.
pub fn cloud_run_env(service: &Value) -> Vec<(String, String)> {
	let containers = service
		.pointer("/template/containers")
		.or_else(|| service.pointer("/spec/template/spec/containers"))
		.and_then(Value::as_array);
	let Some(containers) = containers else {
		return Vec::new();
	};
	containers
		.iter()
		.filter_map(|c| c.get("env").and_then(Value::as_array))
		.flatten()
		.filter_map(|var| {
			let name = var.get("name")?.as_str()?;
			let value = var.get("value").and_then(Value::as_str).unwrap_or_default();
			Some((name.to_owned(), value.to_owned()))
		})
		.collect()
}

pub fn classify_cloud_run(service: &Value) -> CloudRunKind {
	let env = cloud_run_env(service);
	if env
		.iter()
		.any(|(name, _)| AGENT_ENV_VARS.contains(&name.as_str()))
	{
		return CloudRunKind::A2a;
	}
	let name = service
		.get("name")
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_lowercase();
	if name.contains("a2a") {
		CloudRunKind::A2a
	} else if name.contains("mcp") {
		CloudRunKind::McpCandidate
	} else {
		CloudRunKind::Generic
	}
}

/// URIs a Cloud Run service answers on.
pub fn cloud_run_uris(service: &Value) -> Vec<String> {
	let mut uris: Vec<String> = service
		.get("uri")
		.and_then(Value::as_str)
		.into_iter()
		.chain(
			service
				.get("urls")
				.and_then(Value::as_array)
				.into_iter()
				.flatten()
				.filter_map(Value::as_str),
		)
		.map(|u| u.trim_end_matches('/').to_owned())
		.filter(|u| !u.is_empty())
		.collect();
	uris.dedup();
	uris
}

/// True when `needle` occurs in `haystack` as a whole resource name or URI:
/// the match must end the string or be followed by `/`, `:`, `?` or `"`.
/// `reasoningEngines/9` therefore does not match `reasoningEngines/90`.
pub fn mentions(haystack: &str, needle: &str) -> bool {
	if needle.is_empty() {
		return false;
	}
	haystack.match_indices(needle).any(|(at, _)| {
		matches!(
			haystack[at + needle.len()..].chars().next(),
			None | Some('/' | ':' | '?' | '"')
		)
	})
}

/// True when any string inside `payload` [`mentions`] `needle`.
pub fn payload_mentions(payload: &Value, needle: &str) -> bool {
	if needle.is_empty() {
		return false;
	}
	match payload {
		Value::String(s) => mentions(s, needle),
		Value::Array(items) => items.iter().any(|v| payload_mentions(v, needle)),
		Value::Object(map) => map.values().any(|v| payload_mentions(v, needle)),
		_ => false,
	}
}

/// The part of a resource name after `projects/{p}/`. APIs disagree on
/// project number vs project id, so cross references compare this suffix.
pub fn project_relative(name: &str) -> &str {
	let rest = name.strip_prefix("projects/").unwrap_or(name);
	rest.split_once('/').map_or(rest, |(_, tail)| tail)
}

pub fn same_resource(a: &str, b: &str) -> bool {
	a == b || (project_relative(a) == project_relative(b) && !project_relative(a).is_empty())
}

/// Presentation attributes for one node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeStyle {
	pub lane_title: &'static str,
	pub color: &'static str,
	pub glyph: &'static str,
}

pub fn style(node_type: NodeType) -> NodeStyle {
	let (lane_title, color, glyph) = match node_type {
		NodeType::Project => ("Project", "#4285f4", "P"),
		NodeType::Location => ("Locations", "#5f6368", "L"),
		NodeType::Collection => ("Collections", "#8e24aa", "C"),
		NodeType::Engine => ("Engines", "#1e8e3e", "E"),
		NodeType::DataStore => ("Data Stores", "#f29900", "D"),
		NodeType::Assistant => ("Assistants", "#12b5cb", "As"),
		NodeType::Agent => ("Agents", "#d93025", "Ag"),
		NodeType::Authorization => ("Authorizations", "#795548", "Au"),
		NodeType::ReasoningEngine => ("Reasoning Engines", "#e37400", "RE"),
		NodeType::CloudRunService => ("Cloud Run", "#1a73e8", "CR"),
	};
	NodeStyle {
		lane_title,
		color,
		glyph,
	}
}

/// Zero-based swim-lane position.
pub fn lane(node_type: NodeType) -> usize {
	NodeType::ALL
		.iter()
		.position(|t| *t == node_type)
		.unwrap_or_default()
}

/// Value following `key` in a `key/value/key/value` resource name.
pub fn name_segment<'a>(name: &'a str, key: &str) -> Option<&'a str> {
	let mut parts = name.split('/');
	while let Some(part) = parts.next() {
		if part == key {
			return parts.next();
		}
	}
	None
}

const CONSOLE: &str = "https://console.cloud.google.com";

/// Cloud console deep link for a node, where the console has a page for it.
pub fn console_link(node: &GraphNode) -> Option<String> {
	let project = name_segment(&node.id, "projects")?;
	let location = name_segment(&node.id, "locations");
	match node.node_type {
		NodeType::Project => Some(format!("{CONSOLE}/home/dashboard?project={project}")),
		NodeType::Location | NodeType::Collection | NodeType::Assistant => None,
		NodeType::Engine => Some(format!(
			"{CONSOLE}/gen-app-builder/locations/{}/engines/{}/overview?project={project}",
			location?,
			name_segment(&node.id, "engines")?
		)),
		NodeType::Agent => Some(format!(
			"{CONSOLE}/gen-app-builder/locations/{}/engines/{}/agents?project={project}",
			location?,
			name_segment(&node.id, "engines")?
		)),
		NodeType::DataStore => Some(format!(
			"{CONSOLE}/gen-app-builder/locations/{}/collections/{}/data-stores/{}/data?project={project}",
			location?,
			name_segment(&node.id, "collections")?,
			name_segment(&node.id, "dataStores")?
		)),
		NodeType::Authorization => Some(format!(
			"{CONSOLE}/gen-app-builder/authorizations?project={project}"
		)),
		NodeType::ReasoningEngine => Some(format!(
			"{CONSOLE}/vertex-ai/agents/locations/{}/agent-engines/{}?project={project}",
			location?,
			name_segment(&node.id, "reasoningEngines")?
		)),
		NodeType::CloudRunService => Some(format!(
			"{CONSOLE}/run/detail/{}/{}?project={project}",
			location?,
			name_segment(&node.id, "services")?
		)),
	}
}
