//! Process stage: normalizes items to upper-case text and counts them.

use crate::{
	validate_config, Downstream, EffectSink, PipelineError, Stage, StageContext, StageFactory,
	StageRegistry,
};
use flow_types::{
	ConfigSchema, EffectKind, EffectRecord, ImplementationRegistry, Item, Schema, ValidationError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stage that rewrites each item before forwarding it.
///
/// Text is upper-cased; numbers become their string form. The forwarded
/// item is the rewritten one.
pub struct ProcessStage {
	name: String,
	processed: AtomicU64,
	sink: Arc<dyn EffectSink>,
	downstream: Downstream,
}

impl ProcessStage {
	pub fn new(sink: Arc<dyn EffectSink>, downstream: Option<&Arc<dyn Stage>>) -> Self {
		Self {
			name: Registry::NAME.to_string(),
			processed: AtomicU64::new(0),
			sink,
			downstream: Downstream::from_option(downstream),
		}
	}

	/// Number of items handled so far.
	pub fn processed(&self) -> u64 {
		self.processed.load(Ordering::Relaxed)
	}

	fn normalize(item: &Item) -> Item {
		match item {
			Item::Text(s) => Item::Text(s.to_uppercase()),
			other => Item::Text(other.to_string()),
		}
	}
}

impl Stage for ProcessStage {
	fn name(&self) -> &str {
		&self.name
	}

	fn handle(&self, item: &Item) {
		let normalized = Self::normalize(item);
		let count = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
		tracing::trace!(stage = %self.name, count, "Processed item");
		self.sink
			.emit(EffectRecord::new(&self.name, EffectKind::Processed, normalized.clone()));
		self.downstream.forward(&self.name, &normalized);
	}
}

/// Configuration schema for ProcessStage.
pub struct ProcessStageSchema;

impl ConfigSchema for ProcessStageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::empty().validate(config)
	}
}

/// Factory function to create a process stage from configuration.
pub fn create_stage(
	config: &toml::Value,
	context: StageContext,
) -> Result<Arc<dyn Stage>, PipelineError> {
	validate_config(&ProcessStageSchema, &context.name, config)?;

	Ok(Arc::new(ProcessStage {
		name: context.name,
		processed: AtomicU64::new(0),
		sink: context.sink,
		downstream: context.downstream,
	}))
}

/// Registry for the process stage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "process";
	type Factory = StageFactory;

	fn factory() -> Self::Factory {
		create_stage
	}
}

impl StageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::persist::PersistStage;
	use crate::MemorySink;

	#[test]
	fn test_uppercases_and_counts() {
		let sink = Arc::new(MemorySink::new());
		let stage = ProcessStage::new(sink.clone(), None);

		stage.handle(&Item::from("hello"));
		stage.handle(&Item::from("world"));
		stage.handle(&Item::from(42i64));

		assert_eq!(
			sink.lines(),
			vec!["Processed: HELLO", "Processed: WORLD", "Processed: 42"]
		);
		assert_eq!(stage.processed(), 3);
	}

	#[test]
	fn test_forwards_normalized_item() {
		let sink = Arc::new(MemorySink::new());
		let persist: Arc<dyn Stage> = Arc::new(PersistStage::new(sink.clone()));
		let stage = ProcessStage::new(sink.clone(), Some(&persist));

		stage.handle(&Item::from("abc"));
		assert_eq!(sink.lines(), vec!["Processed: ABC", "SAVED TO DB: ABC"]);
	}
}
