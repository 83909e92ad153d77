//! Persist stage: the end of a chain, records that an item was saved.

use crate::{
	validate_config, EffectSink, PipelineError, Stage, StageContext, StageFactory, StageRegistry,
};
use flow_types::{
	ConfigSchema, EffectKind, EffectRecord, Field, FieldType, ImplementationRegistry, Item, Schema,
	ValidationError,
};
use std::sync::Arc;

/// Terminal stage that emits a `Saved` record and never forwards.
///
/// Nothing is actually written anywhere; the record is the effect.
pub struct PersistStage {
	name: String,
	table: Option<String>,
	sink: Arc<dyn EffectSink>,
}

impl PersistStage {
	pub fn new(sink: Arc<dyn EffectSink>) -> Self {
		Self {
			name: Registry::NAME.to_string(),
			table: None,
			sink,
		}
	}

	/// Renders records as `SAVED TO <table>` instead of `SAVED TO DB`.
	pub fn with_table(mut self, table: impl Into<String>) -> Self {
		self.table = Some(table.into());
		self
	}
}

impl Stage for PersistStage {
	fn name(&self) -> &str {
		&self.name
	}

	fn handle(&self, item: &Item) {
		let mut record = EffectRecord::new(&self.name, EffectKind::Saved, item.clone());
		if let Some(table) = &self.table {
			record = record.with_label(format!("SAVED TO {}", table));
		}
		self.sink.emit(record);
	}

	fn is_terminal(&self) -> bool {
		true
	}
}

/// Configuration schema for PersistStage.
pub struct PersistStageSchema;

impl ConfigSchema for PersistStageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![Field::new("table", FieldType::String { non_empty: true })]);

		schema.validate(config)
	}
}

/// Factory function to create a persist stage from configuration.
///
/// Configuration parameters:
/// - `table`: name shown in saved records (optional)
///
/// Fails when the stage was given a downstream, since it is terminal.
pub fn create_stage(
	config: &toml::Value,
	context: StageContext,
) -> Result<Arc<dyn Stage>, PipelineError> {
	validate_config(&PersistStageSchema, &context.name, config)?;

	if context.downstream.is_some() {
		return Err(PipelineError::InvalidChain(format!(
			"stage '{}' is terminal and must be last",
			context.name
		)));
	}

	let table = config
		.get("table")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	Ok(Arc::new(PersistStage {
		name: context.name,
		table,
		sink: context.sink,
	}))
}

/// Registry for the persist stage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "persist";
	type Factory = StageFactory;

	fn factory() -> Self::Factory {
		create_stage
	}
}

impl StageRegistry for Registry {}
