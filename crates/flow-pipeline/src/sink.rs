//! Effect sink implementations.
//!
//! `TracingSink` turns every record into a structured log event and is what
//! the service uses. `MemorySink` keeps records in order so callers can
//! inspect exactly what a pipeline did.

use crate::EffectSink;
use flow_types::{EffectKind, EffectRecord};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Sink that emits one `tracing` event per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
	pub fn new() -> Self {
		Self
	}
}

impl EffectSink for TracingSink {
	fn emit(&self, record: EffectRecord) {
		match record.kind {
			EffectKind::Invalid => tracing::warn!(
				stage = %record.stage,
				kind = %record.kind,
				item = %record.item,
				"{}",
				record
			),
			_ => tracing::info!(
				stage = %record.stage,
				kind = %record.kind,
				item = %record.item,
				"{}",
				record
			),
		}
	}
}

/// Sink that stores records in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
	records: Mutex<Vec<EffectRecord>>,
}

impl MemorySink {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, Vec<EffectRecord>> {
		self.records.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Copy of every record emitted so far.
	pub fn records(&self) -> Vec<EffectRecord> {
		self.lock().clone()
	}

	/// Rendered record lines, e.g. `LOG: hello`.
	pub fn lines(&self) -> Vec<String> {
		self.lock().iter().map(ToString::to_string).collect()
	}

	/// Number of records of each kind.
	pub fn counts(&self) -> HashMap<EffectKind, usize> {
		let mut counts = HashMap::new();
		for record in self.lock().iter() {
			*counts.entry(record.kind).or_insert(0) += 1;
		}
		counts
	}

	/// Removes and returns every record emitted so far.
	pub fn drain(&self) -> Vec<EffectRecord> {
		std::mem::take(&mut *self.lock())
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}
}

impl EffectSink for MemorySink {
	fn emit(&self, record: EffectRecord) {
		self.lock().push(record);
	}
}
