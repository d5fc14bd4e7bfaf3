//! Multi-region crawl of a project's agent platform resources.
//!
//! The crawl walks the containment hierarchy through one bounded work queue.
//! A listing's child calls are queued as soon as it arrives, so a slow
//! branch never holds up an unrelated one. Results are folded into the
//! [`GraphModel`] on this task as they complete, so no locking is needed.
//! Failures below the project are logged and skipped.

use std::collections::VecDeque;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;

use super::fetcher::{Listing, ResourceFetcher, ResourceKind, Scope, fetch_all_pages};
use super::progress::{LogLevel, LogLine, ScanObserver, ScanTicket};
use crate::config::ConsoleConfig;
use crate::error::{FetchError, FetchResult, ScanError};
use crate::graph::classify::{
	cloud_run_env, cloud_run_uris, mentions, payload_mentions, project_relative, same_resource,
};
use crate::graph::{GraphData, GraphEdge, GraphModel, GraphNode, NodeType};

const ENGINE_REFERENCE: &str = "/adkAgentDefinition/provisionedReasoningEngine/reasoningEngine";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
	Complete,
	/// Finished with some branches missing.
	Degraded,
	Failed,
}

/// Final result of one scan.
#[derive(Clone, Debug, PartialEq)]
pub struct ScanOutcome {
	pub project: String,
	pub graph: GraphData,
	pub log: Vec<LogLine>,
	pub status: ScanStatus,
	pub error: Option<ScanError>,
}

impl ScanOutcome {
	pub fn error_message(&self) -> Option<String> {
		self.error.as_ref().map(ToString::to_string)
	}

	pub fn is_superseded(&self) -> bool {
		matches!(self.error, Some(ScanError::Superseded))
	}
}

/// A pending list call and the node its results hang off.
#[derive(Clone, Debug)]
struct ListTask {
	kind: ResourceKind,
	scope: Scope,
	parent: Option<String>,
}

impl ListTask {
	fn new(kind: ResourceKind, scope: Scope, parent: Option<String>) -> Self {
		Self { kind, scope, parent }
	}
}

/// Mutable state of a scan in flight.
struct Run<'a, O: ?Sized> {
	model: GraphModel,
	log: Vec<LogLine>,
	failures: usize,
	project_id: String,
	observer: &'a O,
	ticket: &'a ScanTicket,
}

impl<O: ScanObserver + ?Sized> Run<'_, O> {
	fn push(&mut self, level: LogLevel, message: String) {
		match level {
			LogLevel::Info => info!("{message}"),
			LogLevel::Warn => warn!("{message}"),
			LogLevel::Error => error!("{message}"),
		}
		let line = LogLine::new(level, message);
		if self.ticket.is_current() {
			self.observer.log(&line);
		}
		self.log.push(line);
	}

	fn info(&mut self, message: String) {
		self.push(LogLevel::Info, message);
	}

	fn warn(&mut self, message: String) {
		self.push(LogLevel::Warn, message);
	}

	fn publish(&self) {
		if self.ticket.is_current() {
			self.observer.graph_updated(&self.model.snapshot());
		}
	}

	fn finish(self, project: &str, status: ScanStatus, error: Option<ScanError>) -> ScanOutcome {
		ScanOutcome {
			project: project.to_owned(),
			graph: self.model.into_data(),
			log: self.log,
			status,
			error,
		}
	}
}

/// Scans one project through a [`ResourceFetcher`].
pub struct Crawler<F> {
	fetcher: F,
	config: ConsoleConfig,
}

impl<F: ResourceFetcher> Crawler<F> {
	pub fn new(fetcher: F, config: ConsoleConfig) -> Self {
		Self { fetcher, config }
	}

	pub fn config(&self) -> &ConsoleConfig {
		&self.config
	}

	pub fn fetcher(&self) -> &F {
		&self.fetcher
	}

	/// Runs a full scan of `identifier` (project number or project id).
	///
	/// Progress is reported to `observer` while `ticket` is current. Once a
	/// newer scan starts, this one stops at its next await point and returns
	/// [`ScanError::Superseded`].
	pub async fn scan<O>(&self, identifier: &str, ticket: &ScanTicket, observer: &O) -> ScanOutcome
	where
		O: ScanObserver + ?Sized,
	{
		let identifier = identifier.trim();
		let mut run = Run {
			model: GraphModel::new(),
			log: Vec::new(),
			failures: 0,
			project_id: String::new(),
			observer,
			ticket,
		};

		if identifier.is_empty() {
			run.push(LogLevel::Error, ScanError::InvalidIdentifier.to_string());
			return run.finish(identifier, ScanStatus::Failed, Some(ScanError::InvalidIdentifier));
		}

		run.info(format!("Resolving project {identifier}"));
		let project = self.fetcher.get_project(identifier).await;
		if !ticket.is_current() {
			return run.finish(identifier, ScanStatus::Failed, Some(ScanError::Superseded));
		}
		let project = project.and_then(|payload| {
			if payload.get("projectId").or_else(|| payload.get("projectNumber")).is_some() {
				Ok(payload)
			} else {
				Err(FetchError::MissingField {
					kind: "project",
					field: "projectId",
				})
			}
		});
		let payload = match project {
			Ok(payload) => payload,
			Err(source) => {
				let err = ScanError::ProjectUnresolved {
					identifier: identifier.to_owned(),
					source,
				};
				run.push(LogLevel::Error, err.to_string());
				return run.finish(identifier, ScanStatus::Failed, Some(err));
			}
		};

		let project_key = project_number(&payload).unwrap_or_else(|| identifier.to_owned());
		let project_node = project_node(&project_key, identifier, payload);
		run.project_id = project_node.id.clone();
		run.info(format!("Resolved {} ({})", project_node.label, project_node.id));
		run.model.upsert_node(project_node);
		run.publish();

		let roots = self.root_tasks(&project_key, &run.project_id);
		run.info(format!("Listing {} root scope(s)", roots.len()));
		if let Err(err) = self.crawl(roots, &mut run).await {
			return run.finish(identifier, ScanStatus::Failed, Some(err));
		}

		let linked = link_references(&mut run.model);
		if linked > 0 {
			run.info(format!("Linked {linked} cross-reference(s)"));
		}
		let dropped = run.model.prune_dangling_edges();
		if dropped > 0 {
			run.info(format!("Dropped {dropped} edge(s) to unresolved resources"));
		}
		run.publish();

		let (nodes, edges, failures) = (run.model.node_count(), run.model.snapshot().edges.len(), run.failures);
		if failures > 0 && nodes <= 1 {
			let err = ScanError::NothingDiscovered { failures };
			run.push(LogLevel::Error, err.to_string());
			return run.finish(identifier, ScanStatus::Failed, Some(err));
		}
		let status = if failures == 0 {
			ScanStatus::Complete
		} else {
			ScanStatus::Degraded
		};
		run.info(format!(
			"Scan finished: {nodes} node(s), {edges} edge(s), {failures} failed request(s)"
		));
		run.finish(identifier, status, None)
	}

	fn root_tasks(&self, project_key: &str, project_id: &str) -> Vec<ListTask> {
		let config = &self.config;
		let mut tasks = Vec::new();
		for location in &config.discovery_locations {
			tasks.push(ListTask::new(
				ResourceKind::Collections,
				Scope::location(project_key, location),
				Some(format!("{project_id}/locations/{location}")),
			));
			tasks.push(ListTask::new(
				ResourceKind::Authorizations,
				Scope::location(project_key, location),
				Some(project_id.to_owned()),
			));
		}
		for region in &config.reasoning_engine_regions {
			tasks.push(ListTask::new(
				ResourceKind::ReasoningEngines,
				Scope::location(project_key, region),
				None,
			));
		}
		for region in &config.cloud_run_regions {
			tasks.push(ListTask::new(
				ResourceKind::CloudRunServices,
				Scope::location(project_key, region),
				None,
			));
		}
		tasks
	}

	async fn list(&self, task: ListTask) -> (ListTask, FetchResult<Listing>) {
		let result = fetch_all_pages(&self.fetcher, task.kind, &task.scope, self.config.max_pages).await;
		(task, result)
	}

	/// Drains a single work queue: child list calls are queued as soon as
	/// their parent listing arrives, with at most `max_concurrent_requests`
	/// calls in flight.
	async fn crawl<O>(&self, roots: Vec<ListTask>, run: &mut Run<'_, O>) -> Result<(), ScanError>
	where
		O: ScanObserver + ?Sized,
	{
		let limit = self.config.max_concurrent_requests.max(1);
		let mut pending: VecDeque<ListTask> = roots.into();
		let mut in_flight = FuturesUnordered::new();
		loop {
			while in_flight.len() < limit {
				let Some(task) = pending.pop_front() else {
					break;
				};
				in_flight.push(self.list(task));
			}
			let Some((task, result)) = in_flight.next().await else {
				return Ok(());
			};
			if !run.ticket.is_current() {
				return Err(ScanError::Superseded);
			}
			match result {
				Ok(listing) => {
					let changed = !listing.items.is_empty();
					pending.extend(fold_listing(task, listing, run));
					if changed {
						run.publish();
					}
				}
				Err(err) => {
					run.failures += 1;
					run.warn(format!("Failed to list {} in {}: {err}", task.kind, task.scope));
				}
			}
		}
	}
}

/// `projectNumber` arrives as a string from Resource Manager but as a
/// number from some proxies.
fn project_number(payload: &Value) -> Option<String> {
	match payload.get("projectNumber")? {
		Value::String(n) if !n.is_empty() => Some(n.clone()),
		Value::Number(n) => n.as_u64().map(|n| n.to_string()),
		_ => None,
	}
}

fn project_node(project_key: &str, identifier: &str, payload: Value) -> GraphNode {
	let label = ["displayName", "projectId"]
		.iter()
		.find_map(|k| payload.get(*k).and_then(Value::as_str))
		.unwrap_or(identifier)
		.to_owned();
	GraphNode::new(format!("projects/{project_key}"), NodeType::Project, payload).with_label(label)
}

/// Merges one listing into the model and returns the list calls for its
/// children.
fn fold_listing<O>(task: ListTask, listing: Listing, run: &mut Run<'_, O>) -> Vec<ListTask>
where
	O: ScanObserver + ?Sized,
{
	if listing.truncated {
		run.warn(format!(
			"Stopped paging {} in {} after {} item(s)",
			task.kind,
			task.scope,
			listing.items.len()
		));
	}
	if listing.items.is_empty() {
		return Vec::new();
	}

	if task.kind == ResourceKind::Collections {
		if let Some(location_id) = task.parent.as_deref() {
			if !run.model.contains_node(location_id) {
				let location = GraphNode::new(
					location_id,
					NodeType::Location,
					serde_json::json!({ "name": location_id, "locationId": task.scope.location }),
				);
				run.model.upsert_node(location);
				let edge = GraphEdge::between(run.project_id.clone(), location_id);
				run.model.upsert_edge(edge);
			}
		}
	}

	let count = listing.items.len();
	let mut children = Vec::new();
	for item in listing.items {
		let Some(name) = item.get("name").and_then(Value::as_str).map(str::to_owned) else {
			run.warn(format!("Skipping {} entry without a name in {}", task.kind, task.scope));
			continue;
		};
		if let Some(parent) = &task.parent {
			run.model.upsert_edge(GraphEdge::between(parent.clone(), name.clone()));
		}
		children.extend(child_tasks(task.kind, &name));
		run.model.upsert_node(GraphNode::new(name, task.kind.node_type(), item));
	}
	run.info(format!("Found {count} {} in {}", task.kind, task.scope));
	children
}

fn child_tasks(kind: ResourceKind, name: &str) -> Vec<ListTask> {
	let kinds: &[ResourceKind] = match kind {
		ResourceKind::Collections => &[ResourceKind::Engines, ResourceKind::DataStores],
		ResourceKind::Engines => &[ResourceKind::Assistants],
		ResourceKind::Assistants => &[ResourceKind::Agents],
		_ => &[],
	};
	let Some(scope) = Scope::from_resource_name(name) else {
		return Vec::new();
	};
	kinds
		.iter()
		.map(|k| ListTask::new(*k, scope.clone(), Some(name.to_owned())))
		.collect()
}

/// An explicit provisioned engine reference is authoritative; only agents
/// without one are matched by mention.
fn agent_uses_engine(agent: &Value, engine_id: &str) -> bool {
	match agent.pointer(ENGINE_REFERENCE).and_then(Value::as_str) {
		Some(reference) => same_resource(reference, engine_id),
		None => payload_mentions(agent, project_relative(engine_id)),
	}
}

/// Adds Agent->ReasoningEngine, Agent->CloudRunService and
/// ReasoningEngine->CloudRunService edges found by payload inspection.
fn link_references(model: &mut GraphModel) -> usize {
	let of_type = |t: NodeType| -> Vec<(String, Value)> {
		model
			.nodes()
			.iter()
			.filter(|n| n.node_type == t)
			.map(|n| (n.id.clone(), n.data.clone()))
			.collect()
	};
	let agents = of_type(NodeType::Agent);
	let engines = of_type(NodeType::ReasoningEngine);
	let services: Vec<(String, Vec<String>, Vec<(String, String)>)> = of_type(NodeType::CloudRunService)
		.into_iter()
		.map(|(id, data)| (id, cloud_run_uris(&data), cloud_run_env(&data)))
		.collect();

	let mut edges = Vec::new();
	for (agent_id, agent) in &agents {
		for (engine_id, _) in &engines {
			if agent_uses_engine(agent, engine_id) {
				edges.push(GraphEdge::between(agent_id.clone(), engine_id.clone()));
			}
		}
		for (service_id, uris, _) in &services {
			if uris.iter().any(|uri| payload_mentions(agent, uri)) {
				edges.push(GraphEdge::between(agent_id.clone(), service_id.clone()));
			}
		}
	}
	for (engine_id, _) in &engines {
		let needle = project_relative(engine_id);
		for (service_id, _, env) in &services {
			if env.iter().any(|(_, value)| mentions(value, needle)) {
				edges.push(GraphEdge::between(engine_id.clone(), service_id.clone()));
			}
		}
	}

	let count = edges.len();
	for edge in edges {
		model.upsert_edge(edge);
	}
	count
}
