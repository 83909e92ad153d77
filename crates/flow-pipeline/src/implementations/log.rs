//! Log stage: records every item and forwards it unchanged.

use crate::{
	validate_config, Downstream, EffectSink, PipelineError, Stage, StageContext, StageFactory,
	StageRegistry,
};
use flow_types::{
	ConfigSchema, EffectKind, EffectRecord, Field, FieldType, ImplementationRegistry, Item, Schema,
	ValidationError,
};
use std::sync::Arc;

/// Stage that emits a `Logged` record for each item, then forwards it.
pub struct LogStage {
	name: String,
	prefix: Option<String>,
	sink: Arc<dyn EffectSink>,
	downstream: Downstream,
}

impl LogStage {
	pub fn new(sink: Arc<dyn EffectSink>, downstream: Option<&Arc<dyn Stage>>) -> Self {
		Self {
			name: Registry::NAME.to_string(),
			prefix: None,
			sink,
			downstream: Downstream::from_option(downstream),
		}
	}

	/// Renders records as `<prefix>: <item>` instead of `LOG: <item>`.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());
		self
	}
}

impl Stage for LogStage {
	fn name(&self) -> &str {
		&self.name
	}

	fn handle(&self, item: &Item) {
		let mut record = EffectRecord::new(&self.name, EffectKind::Logged, item.clone());
		if let Some(prefix) = &self.prefix {
			record = record.with_label(prefix);
		}
		self.sink.emit(record);
		self.downstream.forward(&self.name, item);
	}
}

/// Configuration schema for LogStage.
pub struct LogStageSchema;

impl ConfigSchema for LogStageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Records render as "<prefix>: <item>", so a colon in the prefix
		// would make the line ambiguous
		let schema = Schema::new(vec![Field::new(
			"prefix",
			FieldType::String { non_empty: true },
		)
		.with_validator(|value| match value.as_str() {
			Some(prefix) if prefix.contains(':') => Err("must not contain ':'".into()),
			_ => Ok(()),
		})]);

		schema.validate(config)
	}
}

/// Factory function to create a log stage from configuration.
///
/// Configuration parameters:
/// - `prefix`: label used in place of "LOG" (optional)
pub fn create_stage(
	config: &toml::Value,
	context: StageContext,
) -> Result<Arc<dyn Stage>, PipelineError> {
	validate_config(&LogStageSchema, &context.name, config)?;

	let prefix = config
		.get("prefix")
		.and_then(|v| v.as_str())
		.map(str::to_string);

	Ok(Arc::new(LogStage {
		name: context.name,
		prefix,
		sink: context.sink,
		downstream: context.downstream,
	}))
}

/// Registry for the log stage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = StageFactory;

	fn factory() -> Self::Factory {
		create_stage
	}
}

impl StageRegistry for Registry {}
