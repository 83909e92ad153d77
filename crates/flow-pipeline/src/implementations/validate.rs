//! Validate stage: drops items that fail a simple validity check.

use crate::{
	validate_config, Downstream, EffectSink, PipelineError, Stage, StageContext, StageFactory,
	StageRegistry,
};
use flow_types::{
	ConfigSchema, EffectKind, EffectRecord, ImplementationRegistry, Item, Schema, ValidationError,
};
use std::sync::Arc;

/// Minimum string length (exclusive) an item needs to pass.
const MIN_DISPLAY_LEN: usize = 2;

/// Stage that forwards only valid items.
///
/// An item is valid when it is truthy and its string form is longer than
/// two characters. Invalid items produce an `Invalid` record and go no
/// further; this is an outcome, not an error.
pub struct ValidateStage {
	name: String,
	sink: Arc<dyn EffectSink>,
	downstream: Downstream,
}

impl ValidateStage {
	pub fn new(sink: Arc<dyn EffectSink>, downstream: Option<&Arc<dyn Stage>>) -> Self {
		Self {
			name: Registry::NAME.to_string(),
			sink,
			downstream: Downstream::from_option(downstream),
		}
	}

	/// The validity predicate. Total over all items.
	pub fn is_valid(item: &Item) -> bool {
		item.is_truthy() && item.display_len() > MIN_DISPLAY_LEN
	}
}

impl Stage for ValidateStage {
	fn name(&self) -> &str {
		&self.name
	}

	fn handle(&self, item: &Item) {
		if Self::is_valid(item) {
			self.sink
				.emit(EffectRecord::new(&self.name, EffectKind::Valid, item.clone()));
			self.downstream.forward(&self.name, item);
		} else {
			self.sink
				.emit(EffectRecord::new(&self.name, EffectKind::Invalid, item.clone()));
		}
	}
}

/// Configuration schema for ValidateStage.
pub struct ValidateStageSchema;

impl ConfigSchema for ValidateStageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// The validity rule is fixed, so no keys are accepted
		Schema::empty().validate(config)
	}
}

/// Factory function to create a validate stage from configuration.
pub fn create_stage(
	config: &toml::Value,
	context: StageContext,
) -> Result<Arc<dyn Stage>, PipelineError> {
	validate_config(&ValidateStageSchema, &context.name, config)?;

	Ok(Arc::new(ValidateStage {
		name: context.name,
		sink: context.sink,
		downstream: context.downstream,
	}))
}

/// Registry for the validate stage implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "validate";
	type Factory = StageFactory;

	fn factory() -> Self::Factory {
		create_stage
	}
}

impl StageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MemorySink;

	/// Builds validate -> recorder, returning the validate stage and both sinks.
	fn chain() -> (ValidateStage, Arc<dyn Stage>, Arc<MemorySink>, Arc<MemorySink>) {
		let own = Arc::new(MemorySink::new());
		let downstream_sink = Arc::new(MemorySink::new());
		let recorder: Arc<dyn Stage> =
			Arc::new(crate::implementations::persist::PersistStage::new(downstream_sink.clone()));
		let stage = ValidateStage::new(own.clone(), Some(&recorder));
		(stage, recorder, own, downstream_sink)
	}

	#[test]
	fn test_short_and_falsy_items_not_forwarded() {
		let (stage, _recorder, own, downstream) = chain();
		let rejected = [
			Item::from(""),
			Item::from("a"),
			Item::from("hi"),
			Item::from(0i64),
			Item::from(42i64),
			Item::from(0.0),
		];
		for item in &rejected {
			stage.handle(item);
		}

		assert!(downstream.is_empty());
		assert_eq!(own.counts().get(&EffectKind::Invalid), Some(&rejected.len()));
		assert_eq!(own.counts().get(&EffectKind::Valid), None);
	}

	#[test]
	fn test_long_truthy_items_forwarded_once() {
		let (stage, _recorder, own, downstream) = chain();
		let accepted = [
			Item::from("hey"),
			Item::from("python"),
			Item::from(100i64),
			Item::from(-10i64),
			Item::from(1.5),
		];
		for item in &accepted {
			downstream.drain();
			stage.handle(item);
			let forwarded = downstream.records();
			assert_eq!(forwarded.len(), 1, "{} forwarded {} times", item, forwarded.len());
			assert_eq!(&forwarded[0].item, item);
		}
		assert_eq!(own.counts().get(&EffectKind::Valid), Some(&accepted.len()));
	}

	#[test]
	fn test_length_counts_characters_not_bytes() {
		// Two characters, four bytes
		assert!(!ValidateStage::is_valid(&Item::from("éé")));
		assert!(ValidateStage::is_valid(&Item::from("ééé")));
	}

	#[test]
	fn test_whole_float_uses_fractional_form() {
		// "1.0" has three characters
		assert!(ValidateStage::is_valid(&Item::from(1.0)));
		assert!(!ValidateStage::is_valid(&Item::from(10i64)));
	}

	#[test]
	fn test_factory_rejects_unknown_keys() {
		let config: toml::Value = toml::from_str("min_len = 5").unwrap();
		let result = create_stage(
			&config,
			StageContext {
				name: "validate".into(),
				sink: Arc::new(MemorySink::new()),
				downstream: Downstream::none(),
			},
		);
		assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
	}
}
