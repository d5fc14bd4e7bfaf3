use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use architecture_graph::config::ConsoleConfig;
use architecture_graph::crawl::{
	Crawler, LogLevel, LogLine, ResourceFetcher, ResourceKind, ResourcePage, ScanGeneration,
	ScanObserver, ScanOutcome, ScanStatus, Scope,
};
use architecture_graph::error::{FetchError, FetchResult, ScanError};
use architecture_graph::graph::{AdjacencyIndex, GraphData, NodeType};
use async_trait::async_trait;
use futures::executor::block_on;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

const PROJECT: &str = "projects/123";
const GLOBAL: &str = "projects/123/locations/global";
const COLLECTION: &str = "projects/123/locations/global/collections/default_collection";
const ENGINE: &str = "projects/123/locations/global/collections/default_collection/engines/eng1";
const ASSISTANT: &str =
	"projects/123/locations/global/collections/default_collection/engines/eng1/assistants/asst1";
const AGENT: &str = "projects/123/locations/global/collections/default_collection/engines/eng1/assistants/asst1/agents/agent1";
const REASONING_ENGINE: &str = "projects/123/locations/us-central1/reasoningEngines/re1";
const REGION: &str = "projects/123/locations/us-central1";

/// Returns Pending the given number of times so several list calls are in
/// flight together.
struct Yield(usize);

impl Future for Yield {
	type Output = ();

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
		if self.0 == 0 {
			return Poll::Ready(());
		}
		self.0 -= 1;
		cx.waker().wake_by_ref();
		Poll::Pending
	}
}

/// In-memory platform keyed by (kind, parent path), one Vec per page.
#[derive(Default)]
struct FakePlatform {
	project: Option<Value>,
	listings: HashMap<(ResourceKind, String), Vec<Vec<Value>>>,
	failing: HashSet<ResourceKind>,
	/// Extra polls before a listing of this kind completes.
	delays: HashMap<ResourceKind, usize>,
	/// `(kind, finished)` in the order calls started and finished.
	events: RefCell<Vec<(ResourceKind, bool)>>,
	in_flight: Cell<usize>,
	max_in_flight: Cell<usize>,
}

impl FakePlatform {
	fn with(mut self, kind: ResourceKind, parent: &str, items: Vec<Value>) -> Self {
		self.listings.insert((kind, parent.to_owned()), vec![items]);
		self
	}

	fn with_pages(mut self, kind: ResourceKind, parent: &str, pages: Vec<Vec<Value>>) -> Self {
		self.listings.insert((kind, parent.to_owned()), pages);
		self
	}

	fn failing(mut self, kind: ResourceKind) -> Self {
		self.failing.insert(kind);
		self
	}

	fn slow(mut self, kind: ResourceKind, polls: usize) -> Self {
		self.delays.insert(kind, polls);
		self
	}

	fn position(&self, kind: ResourceKind, finished: bool) -> Option<usize> {
		self.events.borrow().iter().position(|e| *e == (kind, finished))
	}
}

#[async_trait(?Send)]
impl ResourceFetcher for FakePlatform {
	async fn get_project(&self, identifier: &str) -> FetchResult<Value> {
		self.project.clone().ok_or_else(|| FetchError::Http {
			status: 404,
			message: format!("project {identifier} not found"),
		})
	}

	async fn list_resources(
		&self,
		kind: ResourceKind,
		scope: &Scope,
		page_token: Option<&str>,
	) -> FetchResult<ResourcePage> {
		self.in_flight.set(self.in_flight.get() + 1);
		self.max_in_flight
			.set(self.max_in_flight.get().max(self.in_flight.get()));
		self.events.borrow_mut().push((kind, false));
		Yield(1 + self.delays.get(&kind).copied().unwrap_or_default()).await;
		self.in_flight.set(self.in_flight.get() - 1);
		self.events.borrow_mut().push((kind, true));

		if self.failing.contains(&kind) {
			return Err(FetchError::Http {
				status: 403,
				message: "permission denied".into(),
			});
		}
		let Some(pages) = self.listings.get(&(kind, scope.parent_path())) else {
			return Ok(ResourcePage::default());
		};
		let index: usize = page_token.map_or(0, |t| t.parse().unwrap());
		Ok(ResourcePage {
			items: pages.get(index).cloned().unwrap_or_default(),
			next_page_token: (index + 1 < pages.len()).then(|| (index + 1).to_string()),
		})
	}
}

fn config() -> ConsoleConfig {
	ConsoleConfig {
		discovery_locations: vec!["global".into()],
		reasoning_engine_regions: vec!["us-central1".into()],
		cloud_run_regions: vec!["us-central1".into()],
		max_concurrent_requests: 2,
		..ConsoleConfig::default()
	}
}

/// my-proj: global / default_collection / eng1 / asst1 / agent1 -> re1
fn platform() -> FakePlatform {
	FakePlatform {
		project: Some(json!({ "projectId": "my-proj", "projectNumber": "123", "name": "My Project" })),
		..FakePlatform::default()
	}
	.with(ResourceKind::Collections, GLOBAL, vec![json!({ "name": COLLECTION, "displayName": "Default" })])
	.with(ResourceKind::Engines, COLLECTION, vec![json!({ "name": ENGINE })])
	.with(ResourceKind::Assistants, ENGINE, vec![json!({ "name": ASSISTANT })])
	.with(
		ResourceKind::Agents,
		ASSISTANT,
		vec![json!({
			"name": AGENT,
			"displayName": "agent1",
			"adkAgentDefinition": { "provisionedReasoningEngine": {
				"reasoningEngine": "projects/my-proj/locations/us-central1/reasoningEngines/re1"
			}}
		})],
	)
	.with(
		ResourceKind::ReasoningEngines,
		REGION,
		vec![json!({ "name": REASONING_ENGINE, "displayName": "re1" })],
	)
}

fn scan(fetcher: FakePlatform) -> (ScanOutcome, Crawler<FakePlatform>) {
	let generation = ScanGeneration::new();
	let ticket = generation.begin();
	let crawler = Crawler::new(fetcher, config());
	let outcome = block_on(crawler.scan("my-proj", &ticket, &()));
	(outcome, crawler)
}

fn sorted_types(graph: &GraphData) -> Vec<NodeType> {
	let mut types: Vec<NodeType> = graph.nodes.iter().map(|n| n.node_type).collect();
	types.sort();
	types
}

#[test]
fn end_to_end_project_scan() {
	let (outcome, _) = scan(platform());

	assert_eq!(outcome.status, ScanStatus::Complete);
	assert_eq!(outcome.error, None);
	assert_eq!(
		sorted_types(&outcome.graph),
		vec![
			NodeType::Project,
			NodeType::Location,
			NodeType::Collection,
			NodeType::Engine,
			NodeType::Assistant,
			NodeType::Agent,
			NodeType::ReasoningEngine,
		]
	);

	let mut edges: Vec<(String, String)> = outcome
		.graph
		.edges
		.iter()
		.map(|e| (e.source.clone(), e.target.clone()))
		.collect();
	edges.sort();
	let mut expected: Vec<(String, String)> = [
		(PROJECT, GLOBAL),
		(GLOBAL, COLLECTION),
		(COLLECTION, ENGINE),
		(ENGINE, ASSISTANT),
		(ASSISTANT, AGENT),
		(AGENT, REASONING_ENGINE),
	]
	.iter()
	.map(|(s, t)| (s.to_string(), t.to_string()))
	.collect();
	expected.sort();
	assert_eq!(edges, expected);

	let index = AdjacencyIndex::build(&outcome.graph.nodes, &outcome.graph.edges);
	assert_eq!(index.compute_highlight(AGENT).node_ids.len(), 7);

	let project = outcome.graph.node(PROJECT).unwrap();
	assert_eq!(project.label, "my-proj");
	assert_eq!(outcome.graph.node(COLLECTION).unwrap().label, "Default");
}

#[test]
fn failed_branch_is_logged_and_scan_degrades() {
	let (outcome, _) = scan(platform().failing(ResourceKind::Authorizations));

	assert_eq!(outcome.status, ScanStatus::Degraded);
	assert_eq!(outcome.error, None);
	for id in [GLOBAL, COLLECTION, ENGINE] {
		assert!(outcome.graph.node(id).is_some(), "missing {id}");
	}
	let warnings: Vec<&LogLine> = outcome
		.log
		.iter()
		.filter(|l| l.level == LogLevel::Warn)
		.collect();
	assert_eq!(warnings.len(), 1);
	assert!(warnings[0].message.contains("authorizations"));
	assert!(warnings[0].message.contains("permission denied"));
}

#[test]
fn unresolved_project_is_fatal() {
	let fetcher = FakePlatform::default();
	let (outcome, _) = scan(fetcher);

	assert_eq!(outcome.status, ScanStatus::Failed);
	assert!(matches!(outcome.error, Some(ScanError::ProjectUnresolved { .. })));
	assert!(outcome.graph.nodes.is_empty());
	assert_eq!(outcome.log.last().map(|l| l.level), Some(LogLevel::Error));
}

#[test]
fn project_payload_without_identity_is_fatal() {
	let fetcher = FakePlatform {
		project: Some(json!({ "lifecycleState": "ACTIVE" })),
		..FakePlatform::default()
	};
	let (outcome, _) = scan(fetcher);
	assert_eq!(
		outcome.error,
		Some(ScanError::ProjectUnresolved {
			identifier: "my-proj".into(),
			source: FetchError::MissingField {
				kind: "project",
				field: "projectId",
			},
		})
	);
}

#[test]
fn blank_identifier_is_rejected() {
	let generation = ScanGeneration::new();
	let crawler = Crawler::new(platform(), config());
	let outcome = block_on(crawler.scan("   ", &generation.begin(), &()));
	assert_eq!(outcome.error, Some(ScanError::InvalidIdentifier));
}

#[test]
fn nothing_discovered_is_an_error() {
	let fetcher = FakePlatform {
		project: Some(json!({ "projectId": "my-proj", "projectNumber": "123" })),
		..FakePlatform::default()
	}
	.failing(ResourceKind::Collections)
	.failing(ResourceKind::Authorizations)
	.failing(ResourceKind::ReasoningEngines)
	.failing(ResourceKind::CloudRunServices);
	let (outcome, _) = scan(fetcher);

	assert_eq!(outcome.status, ScanStatus::Failed);
	assert_eq!(outcome.error, Some(ScanError::NothingDiscovered { failures: 4 }));
	assert!(outcome.error_message().unwrap().contains("4 request(s) failed"));
}

#[test]
fn empty_project_is_a_complete_scan() {
	let fetcher = FakePlatform {
		project: Some(json!({ "projectId": "my-proj" })),
		..FakePlatform::default()
	};
	let (outcome, _) = scan(fetcher);
	assert_eq!(outcome.status, ScanStatus::Complete);
	assert_eq!(outcome.graph.nodes.len(), 1);
	assert_eq!(outcome.graph.nodes[0].id, "projects/my-proj");
}

#[test]
fn requests_are_bounded() {
	let (_, crawler) = scan(platform());
	assert_eq!(crawler.fetcher().max_in_flight.get(), 2);
}

#[test]
fn pages_are_merged_and_duplicates_collapse() {
	let engine2 = format!("{COLLECTION}/engines/eng2");
	let fetcher = platform().with_pages(
		ResourceKind::Engines,
		COLLECTION,
		vec![
			vec![json!({ "name": ENGINE })],
			vec![json!({ "name": engine2 }), json!({ "name": ENGINE, "displayName": "renamed" })],
		],
	);
	let (outcome, _) = scan(fetcher);

	let engines: Vec<_> = outcome
		.graph
		.nodes
		.iter()
		.filter(|n| n.node_type == NodeType::Engine)
		.collect();
	assert_eq!(engines.len(), 2);
	assert_eq!(outcome.graph.node(ENGINE).unwrap().label, "renamed");
	let collection_edges = outcome
		.graph
		.edges
		.iter()
		.filter(|e| e.source == COLLECTION)
		.count();
	assert_eq!(collection_edges, 2);
}

#[test]
fn unnamed_items_are_skipped() {
	let fetcher = platform().with(
		ResourceKind::DataStores,
		COLLECTION,
		vec![json!({ "displayName": "orphan" }), json!({ "name": format!("{COLLECTION}/dataStores/docs") })],
	);
	let (outcome, _) = scan(fetcher);
	assert_eq!(outcome.status, ScanStatus::Complete);
	assert!(outcome.graph.node(&format!("{COLLECTION}/dataStores/docs")).is_some());
	assert!(
		outcome
			.log
			.iter()
			.any(|l| l.level == LogLevel::Warn && l.message.contains("without a name"))
	);
}

/// Records every published snapshot size.
#[derive(Default)]
struct Recorder {
	snapshots: RefCell<Vec<usize>>,
	lines: Cell<usize>,
}

impl ScanObserver for Recorder {
	fn log(&self, _line: &LogLine) {
		self.lines.set(self.lines.get() + 1);
	}

	fn graph_updated(&self, graph: &GraphData) {
		self.snapshots.borrow_mut().push(graph.nodes.len());
	}
}

#[test]
fn progress_is_published_incrementally() {
	let generation = ScanGeneration::new();
	let crawler = Crawler::new(platform(), config());
	let recorder = Recorder::default();
	let outcome = block_on(crawler.scan("my-proj", &generation.begin(), &recorder));

	let snapshots = recorder.snapshots.borrow();
	assert!(snapshots.len() >= 4);
	assert_eq!(snapshots.first(), Some(&1));
	assert_eq!(snapshots.last(), Some(&7));
	assert!(snapshots.windows(2).all(|w| w[0] <= w[1]));
	assert_eq!(recorder.lines.get(), outcome.log.len());
}

/// Starts a newer scan as soon as the first snapshot arrives.
struct Supersede {
	generation: ScanGeneration,
	updates: Cell<usize>,
}

impl ScanObserver for Supersede {
	fn graph_updated(&self, _graph: &GraphData) {
		self.updates.set(self.updates.get() + 1);
		self.generation.begin();
	}
}

#[test]
fn superseded_scan_stops_publishing() {
	let generation = ScanGeneration::new();
	let ticket = generation.begin();
	let observer = Supersede {
		generation: generation.clone(),
		updates: Cell::new(0),
	};
	let crawler = Crawler::new(platform(), config());
	let outcome = block_on(crawler.scan("my-proj", &ticket, &observer));

	assert!(outcome.is_superseded());
	assert_eq!(observer.updates.get(), 1);
	assert!(!ticket.is_current());
}

#[test]
fn authorizations_and_data_stores_hang_off_their_parents() {
	let authorization = format!("{GLOBAL}/authorizations/github-oauth");
	let data_store = format!("{COLLECTION}/dataStores/docs");
	let fetcher = platform()
		.with(ResourceKind::Authorizations, GLOBAL, vec![json!({ "name": authorization })])
		.with(ResourceKind::DataStores, COLLECTION, vec![json!({ "name": data_store })]);
	let (outcome, _) = scan(fetcher);

	assert_eq!(outcome.status, ScanStatus::Complete);
	assert_eq!(outcome.graph.node(&authorization).map(|n| n.node_type), Some(NodeType::Authorization));
	assert_eq!(outcome.graph.node(&data_store).map(|n| n.node_type), Some(NodeType::DataStore));
	let edges: Vec<(&str, &str)> = outcome
		.graph
		.edges
		.iter()
		.map(|e| (e.source.as_str(), e.target.as_str()))
		.collect();
	assert!(edges.contains(&(PROJECT, authorization.as_str())));
	assert!(edges.contains(&(COLLECTION, data_store.as_str())));

	let index = AdjacencyIndex::build(&outcome.graph.nodes, &outcome.graph.edges);
	let lineage = index.compute_highlight(PROJECT);
	assert!(lineage.contains_node(&authorization));
	assert!(lineage.contains_node(&data_store));
	assert_eq!(lineage.node_ids.len(), 9);
}

#[test]
fn numeric_project_number_keys_the_crawl() {
	let mut fetcher = platform();
	fetcher.project = Some(json!({ "projectId": "my-proj", "projectNumber": 123 }));
	let (outcome, _) = scan(fetcher);

	assert_eq!(outcome.status, ScanStatus::Complete);
	assert!(outcome.graph.node(PROJECT).is_some());
	assert_eq!(outcome.graph.nodes.len(), 7);
	assert_eq!(outcome.graph.edges.len(), 6);
}

#[test]
fn slow_branch_does_not_hold_up_the_hierarchy() {
	let (outcome, crawler) = scan(platform().slow(ResourceKind::CloudRunServices, 200));
	let fetcher = crawler.fetcher();

	assert_eq!(outcome.graph.nodes.len(), 7);
	let agents_started = fetcher.position(ResourceKind::Agents, false).unwrap();
	let cloud_run_done = fetcher.position(ResourceKind::CloudRunServices, true).unwrap();
	assert!(agents_started < cloud_run_done);
	assert!(fetcher.max_in_flight.get() <= 2);
}
