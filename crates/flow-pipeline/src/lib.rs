//! Stage pipeline module for the flow workspace.
//!
//! A pipeline is a chain of stages. Each stage performs one local effect for
//! an item (log it, validate it, save it) and then may forward the item to
//! the next stage with a direct, synchronous call. Stages report what they did
//! only through an [`EffectSink`] supplied by the caller.

use flow_types::{ConfigSchema, EffectRecord, ImplementationRegistry, Item, ValidationError};
use std::sync::{Arc, Weak};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod persist;
	pub mod process;
	pub mod validate;
}
pub mod pipeline;
pub mod records;
pub mod sink;

pub use pipeline::Pipeline;
pub use records::{filter_min_price, transform, RawRecord, Record, RecordError};
pub use sink::{MemorySink, TracingSink};

/// Errors that can occur while building a pipeline.
///
/// Handling an item never fails; these only surface at construction time.
#[derive(Debug, Error)]
pub enum PipelineError {
	/// The configured stage kind has no registered implementation.
	#[error("Unknown stage kind: {0}")]
	UnknownStage(String),
	/// A stage table failed schema validation.
	#[error("Invalid configuration for stage '{stage}': {source}")]
	InvalidConfig {
		stage: String,
		#[source]
		source: ValidationError,
	},
	/// The stages do not form a valid chain.
	#[error("Invalid pipeline: {0}")]
	InvalidChain(String),
}

/// Destination for the effect records stages emit.
///
/// Sinks are shared between stages and possibly between threads, so every
/// implementation must accept concurrent `emit` calls.
pub trait EffectSink: Send + Sync {
	fn emit(&self, record: EffectRecord);
}

/// Trait implemented by every pipeline stage.
pub trait Stage: Send + Sync {
	/// Name used in effect records.
	fn name(&self) -> &str;

	/// Processes one item. All observable effects go to the stage's sink.
	fn handle(&self, item: &Item);

	/// Terminal stages never forward and must be last in a chain.
	fn is_terminal(&self) -> bool {
		false
	}
}

/// Non-owning link from a stage to the next one.
///
/// The link is fixed when the stage is built. Whoever assembled the chain
/// keeps the stages alive; if the target has already been dropped, forwarding
/// quietly stops at this stage.
#[derive(Clone, Default)]
pub struct Downstream {
	target: Option<Weak<dyn Stage>>,
}

impl Downstream {
	/// A link to nothing, for the end of a chain.
	pub fn none() -> Self {
		Self::default()
	}

	pub fn to(stage: &Arc<dyn Stage>) -> Self {
		Self {
			target: Some(Arc::downgrade(stage)),
		}
	}

	pub fn from_option(stage: Option<&Arc<dyn Stage>>) -> Self {
		stage.map(Self::to).unwrap_or_default()
	}

	pub fn is_some(&self) -> bool {
		self.target.is_some()
	}

	/// Hands `item` to the downstream stage, if there is one still alive.
	pub fn forward(&self, from: &str, item: &Item) {
		let Some(target) = &self.target else {
			return;
		};
		match target.upgrade() {
			Some(stage) => stage.handle(item),
			None => tracing::warn!(stage = from, "Downstream stage dropped, item not forwarded"),
		}
	}
}

impl std::fmt::Debug for Downstream {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let target = self
			.target
			.as_ref()
			.and_then(Weak::upgrade)
			.map(|stage| stage.name().to_string());
		f.debug_struct("Downstream").field("target", &target).finish()
	}
}

/// Everything a stage factory needs besides its own configuration.
#[derive(Clone)]
pub struct StageContext {
	/// Name the stage should report in its records.
	pub name: String,
	/// Shared destination for effect records.
	pub sink: Arc<dyn EffectSink>,
	/// Where the stage forwards items.
	pub downstream: Downstream,
}

/// Type alias for stage factory functions.
pub type StageFactory = fn(&toml::Value, StageContext) -> Result<Arc<dyn Stage>, PipelineError>;

/// Registry trait for stage implementations.
pub trait StageRegistry: ImplementationRegistry<Factory = StageFactory> {}

/// Get all registered stage implementations.
///
/// Returns a vector of (kind, factory) tuples used by [`Pipeline::from_specs`]
/// to resolve `kind` names from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, StageFactory)> {
	use implementations::{log, persist, process, validate};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(validate::Registry::NAME, validate::Registry::factory()),
		(persist::Registry::NAME, persist::Registry::factory()),
		(process::Registry::NAME, process::Registry::factory()),
	]
}

/// Validates a stage table against its schema, tagging errors with the stage name.
pub(crate) fn validate_config(
	schema: &dyn ConfigSchema,
	stage: &str,
	config: &toml::Value,
) -> Result<(), PipelineError> {
	schema
		.validate(config)
		.map_err(|source| PipelineError::InvalidConfig {
			stage: stage.to_string(),
			source,
		})
}
