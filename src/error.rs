//! Error types for resource fetching and scans.

use thiserror::Error;

/// A single failed API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
	#[error("HTTP {status}: {message}")]
	Http { status: u16, message: String },

	#[error("request failed: {0}")]
	Transport(String),

	#[error("unexpected response: {0}")]
	Decode(String),

	#[error("{kind} payload is missing `{field}`")]
	MissingField { kind: &'static str, field: &'static str },
}

impl From<reqwest::Error> for FetchError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			FetchError::Decode(err.to_string())
		} else if let Some(status) = err.status() {
			FetchError::Http {
				status: status.as_u16(),
				message: err.to_string(),
			}
		} else {
			FetchError::Transport(err.to_string())
		}
	}
}

/// Terminal scan failures. Anything else is logged and the crawl goes on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
	#[error("enter a project number or project id")]
	InvalidIdentifier,

	#[error("could not resolve project `{identifier}`: {source}")]
	ProjectUnresolved {
		identifier: String,
		#[source]
		source: FetchError,
	},

	#[error("nothing discovered under the project ({failures} request(s) failed)")]
	NothingDiscovered { failures: usize },

	#[error("scan superseded by a newer scan")]
	Superseded,
}

pub type FetchResult<T> = Result<T, FetchError>;
