//! [`ResourceFetcher`] over the Google Cloud REST APIs.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::fetcher::{ResourceFetcher, ResourceKind, ResourcePage, Scope};
use crate::config::ConsoleConfig;
use crate::error::{FetchError, FetchResult};

const RESOURCE_MANAGER: &str = "https://cloudresourcemanager.googleapis.com/v1";
const CLOUD_RUN: &str = "https://run.googleapis.com/v2";
const DISCOVERY_VERSION: &str = "v1alpha";
const AIPLATFORM_VERSION: &str = "v1beta1";

/// Authenticated client for the platform APIs. The access token is an
/// opaque bearer string supplied by the operator.
#[derive(Clone, Debug)]
pub struct RestFetcher {
	client: Client,
	token: String,
	page_size: u32,
	api_root_override: Option<String>,
}

impl RestFetcher {
	pub fn new(token: impl Into<String>, config: &ConsoleConfig) -> Self {
		Self {
			client: Client::new(),
			token: token.into(),
			page_size: config.page_size,
			api_root_override: config
				.api_root_override
				.as_ref()
				.map(|root| root.trim_end_matches('/').to_owned()),
		}
	}

	fn discovery_root(&self, location: &str) -> String {
		if let Some(root) = &self.api_root_override {
			return format!("{root}/{DISCOVERY_VERSION}");
		}
		match location {
			"global" => format!("https://discoveryengine.googleapis.com/{DISCOVERY_VERSION}"),
			multi => format!("https://{multi}-discoveryengine.googleapis.com/{DISCOVERY_VERSION}"),
		}
	}

	fn aiplatform_root(&self, region: &str) -> String {
		match &self.api_root_override {
			Some(root) => format!("{root}/{AIPLATFORM_VERSION}"),
			None => format!("https://{region}-aiplatform.googleapis.com/{AIPLATFORM_VERSION}"),
		}
	}

	fn root_or(&self, default: &str, version: &str) -> String {
		match &self.api_root_override {
			Some(root) => format!("{root}/{version}"),
			None => default.to_owned(),
		}
	}

	pub fn list_url(&self, kind: ResourceKind, scope: &Scope) -> String {
		let root = match kind {
			ResourceKind::ReasoningEngines => self.aiplatform_root(&scope.location),
			ResourceKind::CloudRunServices => self.root_or(CLOUD_RUN, "v2"),
			_ => self.discovery_root(&scope.location),
		};
		format!("{root}/{}/{}", scope.parent_path(), kind.collection_segment())
	}

	fn authorized(&self, request: RequestBuilder, project: &str) -> RequestBuilder {
		request
			.bearer_auth(&self.token)
			.header("X-Goog-User-Project", project)
	}

	async fn send(&self, request: RequestBuilder) -> FetchResult<Value> {
		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(FetchError::Http {
				status: status.as_u16(),
				message: error_message(&body).unwrap_or_else(|| status.to_string()),
			});
		}
		Ok(response.json::<Value>().await?)
	}
}

/// Pulls `error.message` out of a Google API error body.
fn error_message(body: &str) -> Option<String> {
	let value: Value = serde_json::from_str(body).ok()?;
	value
		.pointer("/error/message")
		.and_then(Value::as_str)
		.map(str::to_owned)
}

#[async_trait(?Send)]
impl ResourceFetcher for RestFetcher {
	async fn get_project(&self, identifier: &str) -> FetchResult<Value> {
		let url = format!("{}/projects/{identifier}", self.root_or(RESOURCE_MANAGER, "v1"));
		debug!("GET {url}");
		let request = self.authorized(self.client.get(&url), identifier);
		self.send(request).await
	}

	async fn list_resources(
		&self,
		kind: ResourceKind,
		scope: &Scope,
		page_token: Option<&str>,
	) -> FetchResult<ResourcePage> {
		let url = self.list_url(kind, scope);
		debug!("GET {url} (page token: {page_token:?})");
		let mut request = self
			.client
			.get(&url)
			.query(&[("pageSize", self.page_size.to_string())]);
		if let Some(token) = page_token {
			request = request.query(&[("pageToken", token)]);
		}
		let body = self.send(self.authorized(request, &scope.project)).await?;
		parse_page(kind, body)
	}
}

fn parse_page(kind: ResourceKind, body: Value) -> FetchResult<ResourcePage> {
	let Value::Object(mut body) = body else {
		return Err(FetchError::Decode(format!("{kind} response is not an object")));
	};
	let items = match body.remove(kind.collection_segment()) {
		Some(Value::Array(items)) => items,
		None | Some(Value::Null) => Vec::new(),
		Some(_) => {
			return Err(FetchError::Decode(format!(
				"`{}` is not an array",
				kind.collection_segment()
			)));
		}
	};
	let next_page_token = body
		.get("nextPageToken")
		.and_then(Value::as_str)
		.map(str::to_owned);
	Ok(ResourcePage {
		items,
		next_page_token,
	})
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn fetcher(root: Option<&str>) -> RestFetcher {
		let config = ConsoleConfig {
			api_root_override: root.map(str::to_owned),
			..ConsoleConfig::default()
		};
		RestFetcher::new("token", &config)
	}

	#[test]
	fn discovery_urls_use_regional_hosts() {
		let f = fetcher(None);
		let mut scope = Scope::location("123", "eu");
		scope.collection = Some("default_collection".into());
		assert_eq!(
			f.list_url(ResourceKind::Engines, &scope),
			"https://eu-discoveryengine.googleapis.com/v1alpha/projects/123/locations/eu/collections/default_collection/engines"
		);
		assert_eq!(
			f.list_url(ResourceKind::Collections, &Scope::location("123", "global")),
			"https://discoveryengine.googleapis.com/v1alpha/projects/123/locations/global/collections"
		);
	}

	#[test]
	fn regional_service_urls() {
		let f = fetcher(None);
		let scope = Scope::location("123", "us-central1");
		assert_eq!(
			f.list_url(ResourceKind::ReasoningEngines, &scope),
			"https://us-central1-aiplatform.googleapis.com/v1beta1/projects/123/locations/us-central1/reasoningEngines"
		);
		assert_eq!(
			f.list_url(ResourceKind::CloudRunServices, &scope),
			"https://run.googleapis.com/v2/projects/123/locations/us-central1/services"
		);
	}

	#[test]
	fn override_routes_everything_to_one_root() {
		let f = fetcher(Some("http://localhost:8080/"));
		let scope = Scope::location("123", "us-central1");
		assert_eq!(
			f.list_url(ResourceKind::CloudRunServices, &scope),
			"http://localhost:8080/v2/projects/123/locations/us-central1/services"
		);
	}

	#[test]
	fn pages_are_parsed() {
		let page = parse_page(
			ResourceKind::DataStores,
			json!({ "dataStores": [{ "name": "a" }, { "name": "b" }], "nextPageToken": "t2" }),
		)
		.unwrap();
		assert_eq!(page.items.len(), 2);
		assert_eq!(page.next_page_token.as_deref(), Some("t2"));

		let empty = parse_page(ResourceKind::Agents, json!({})).unwrap();
		assert!(empty.items.is_empty());

		assert!(parse_page(ResourceKind::Agents, json!({ "agents": 3 })).is_err());
	}

	#[test]
	fn google_error_bodies_are_unwrapped() {
		let body = r#"{"error":{"code":403,"message":"Permission denied on resource","status":"PERMISSION_DENIED"}}"#;
		assert_eq!(error_message(body).as_deref(), Some("Permission denied on resource"));
		assert_eq!(error_message("<html>"), None);
	}
}
