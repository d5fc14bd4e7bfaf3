//! Console settings.
//!
//! Read from a `<meta name="architecture-config" content="{...}">` tag in
//! the host page; every field is optional and falls back to its default.

use log::warn;
use serde::Deserialize;

const META_SELECTOR: &str = "meta[name='architecture-config']";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleConfig {
	/// Discovery Engine locations crawled for collections and authorizations.
	pub discovery_locations: Vec<String>,
	pub reasoning_engine_regions: Vec<String>,
	pub cloud_run_regions: Vec<String>,
	/// Upper bound on in-flight API requests during a scan.
	pub max_concurrent_requests: usize,
	/// Hard cap on pages followed per list call.
	pub max_pages: usize,
	pub page_size: u32,
	/// Send every API call to this base URL instead of the public endpoints.
	pub api_root_override: Option<String>,
}

impl Default for ConsoleConfig {
	fn default() -> Self {
		Self {
			discovery_locations: vec!["global".into(), "us".into(), "eu".into()],
			reasoning_engine_regions: vec!["us-central1".into()],
			cloud_run_regions: vec!["us-central1".into()],
			max_concurrent_requests: 4,
			max_pages: 20,
			page_size: 100,
			api_root_override: None,
		}
	}
}

impl ConsoleConfig {
	pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
		let mut config: Self = serde_json::from_str(raw)?;
		config.max_concurrent_requests = config.max_concurrent_requests.max(1);
		config.max_pages = config.max_pages.max(1);
		Ok(config)
	}

	/// Reads the config tag from the current document.
	pub fn load() -> Self {
		let raw = web_sys::window()
			.and_then(|w| w.document())
			.and_then(|d| d.query_selector(META_SELECTOR).ok().flatten())
			.and_then(|el| el.get_attribute("content"));
		match raw {
			Some(raw) => Self::from_json(&raw).unwrap_or_else(|err| {
				warn!("ignoring malformed architecture-config: {err}");
				Self::default()
			}),
			None => Self::default(),
		}
	}
}
