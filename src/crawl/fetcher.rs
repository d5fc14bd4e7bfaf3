use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchResult;
use crate::graph::NodeType;

/// The list endpoints the crawl walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Collections,
	Engines,
	Assistants,
	Agents,
	DataStores,
	Authorizations,
	ReasoningEngines,
	CloudRunServices,
}

impl ResourceKind {
	pub fn node_type(self) -> NodeType {
		match self {
			ResourceKind::Collections => NodeType::Collection,
			ResourceKind::Engines => NodeType::Engine,
			ResourceKind::Assistants => NodeType::Assistant,
			ResourceKind::Agents => NodeType::Agent,
			ResourceKind::DataStores => NodeType::DataStore,
			ResourceKind::Authorizations => NodeType::Authorization,
			ResourceKind::ReasoningEngines => NodeType::ReasoningEngine,
			ResourceKind::CloudRunServices => NodeType::CloudRunService,
		}
	}

	/// Path segment under the parent, also the response's item array key
	/// (except Cloud Run, which answers with `services`).
	pub fn collection_segment(self) -> &'static str {
		match self {
			ResourceKind::Collections => "collections",
			ResourceKind::Engines => "engines",
			ResourceKind::Assistants => "assistants",
			ResourceKind::Agents => "agents",
			ResourceKind::DataStores => "dataStores",
			ResourceKind::Authorizations => "authorizations",
			ResourceKind::ReasoningEngines => "reasoningEngines",
			ResourceKind::CloudRunServices => "services",
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			ResourceKind::Collections => "collections",
			ResourceKind::Engines => "engines",
			ResourceKind::Assistants => "assistants",
			ResourceKind::Agents => "agents",
			ResourceKind::DataStores => "data stores",
			ResourceKind::Authorizations => "authorizations",
			ResourceKind::ReasoningEngines => "reasoning engines",
			ResourceKind::CloudRunServices => "Cloud Run services",
		}
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

/// Where a list call is rooted. Fields past `location` are set as deep as
/// the resource kind requires.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scope {
	pub project: String,
	pub location: String,
	pub collection: Option<String>,
	pub engine: Option<String>,
	pub assistant: Option<String>,
}

impl Scope {
	pub fn location(project: impl Into<String>, location: impl Into<String>) -> Self {
		Self {
			project: project.into(),
			location: location.into(),
			..Self::default()
		}
	}

	/// Rebuilds the scope a resource name describes, e.g.
	/// `projects/P/locations/L/collections/C/engines/E`.
	pub fn from_resource_name(name: &str) -> Option<Self> {
		let mut scope = Self::default();
		let mut parts = name.split('/');
		while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
			let value = value.to_owned();
			match key {
				"projects" => scope.project = value,
				"locations" => scope.location = value,
				"collections" => scope.collection = Some(value),
				"engines" => scope.engine = Some(value),
				"assistants" => scope.assistant = Some(value),
				_ => {}
			}
		}
		(!scope.project.is_empty() && !scope.location.is_empty()).then_some(scope)
	}

	/// Resource name of the parent a list call is made against.
	pub fn parent_path(&self) -> String {
		let mut path = format!("projects/{}/locations/{}", self.project, self.location);
		for (key, value) in [
			("collections", &self.collection),
			("engines", &self.engine),
			("assistants", &self.assistant),
		] {
			match value {
				Some(v) => path.push_str(&format!("/{key}/{v}")),
				None => break,
			}
		}
		path
	}
}

impl fmt::Display for Scope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.parent_path())
	}
}

/// One page of a list response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourcePage {
	pub items: Vec<Value>,
	pub next_page_token: Option<String>,
}

/// Access to the platform's REST surface. Implementations make a single
/// attempt per call; pagination is driven by the caller.
#[async_trait(?Send)]
pub trait ResourceFetcher {
	/// Resolves a project number or project id to its payload.
	async fn get_project(&self, identifier: &str) -> FetchResult<Value>;

	async fn list_resources(
		&self,
		kind: ResourceKind,
		scope: &Scope,
		page_token: Option<&str>,
	) -> FetchResult<ResourcePage>;
}

/// All items of a paginated listing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Listing {
	pub items: Vec<Value>,
	/// Set when `max_pages` was reached with pages still remaining.
	pub truncated: bool,
}

/// Follows `nextPageToken` until exhausted or `max_pages` pages were read.
pub async fn fetch_all_pages<F>(
	fetcher: &F,
	kind: ResourceKind,
	scope: &Scope,
	max_pages: usize,
) -> FetchResult<Listing>
where
	F: ResourceFetcher + ?Sized,
{
	let mut listing = Listing::default();
	let mut token: Option<String> = None;
	for _ in 0..max_pages.max(1) {
		let page = fetcher
			.list_resources(kind, scope, token.as_deref())
			.await?;
		listing.items.extend(page.items);
		match page.next_page_token.filter(|t| !t.is_empty()) {
			// a server echoing the same token would otherwise spin until the cap
			Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
			Some(_) => {
				listing.truncated = true;
				return Ok(listing);
			}
			None => return Ok(listing),
		}
	}
	listing.truncated = true;
	Ok(listing)
}
