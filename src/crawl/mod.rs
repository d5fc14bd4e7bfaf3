//! Resource discovery for the architecture graph.

mod fetcher;
mod orchestrator;
mod progress;
mod rest;

pub use fetcher::{Listing, ResourceFetcher, ResourceKind, ResourcePage, Scope, fetch_all_pages};
pub use orchestrator::{Crawler, ScanOutcome, ScanStatus};
pub use progress::{LogLevel, LogLine, ScanGeneration, ScanObserver, ScanTicket};
pub use rest::RestFetcher;
