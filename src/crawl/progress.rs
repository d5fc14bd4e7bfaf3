use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::GraphData;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LogLevel {
	Info,
	Warn,
	Error,
}

/// One line of the user-visible scan log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogLine {
	pub at: DateTime<Utc>,
	pub level: LogLevel,
	pub message: String,
}

impl LogLine {
	pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
		Self {
			at: Utc::now(),
			level,
			message: message.into(),
		}
	}
}

impl fmt::Display for LogLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}] {}", self.at.format("%H:%M:%S"), self.message)
	}
}

/// Receives crawl progress while the scan is in flight.
pub trait ScanObserver {
	fn log(&self, _line: &LogLine) {}

	fn graph_updated(&self, _graph: &GraphData) {}
}

impl ScanObserver for () {}

/// Monotonic scan counter shared by the session and in-flight crawls.
#[derive(Clone, Debug, Default)]
pub struct ScanGeneration(Arc<AtomicU64>);

impl ScanGeneration {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a new generation, invalidating every earlier ticket.
	pub fn begin(&self) -> ScanTicket {
		let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
		ScanTicket {
			generation: self.clone(),
			id,
		}
	}

	/// Invalidates outstanding tickets without starting a scan.
	pub fn cancel(&self) {
		self.0.fetch_add(1, Ordering::SeqCst);
	}

	fn current(&self) -> u64 {
		self.0.load(Ordering::SeqCst)
	}
}

impl PartialEq for ScanGeneration {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

/// Proof that a crawl belongs to the latest generation.
#[derive(Clone, Debug)]
pub struct ScanTicket {
	generation: ScanGeneration,
	id: u64,
}

impl ScanTicket {
	pub fn is_current(&self) -> bool {
		self.generation.current() == self.id
	}

	pub fn id(&self) -> u64 {
		self.id
	}
}
