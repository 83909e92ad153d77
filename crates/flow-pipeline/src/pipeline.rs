//! Assembly of stages into a chain.
//!
//! Stages only hold weak links to the stage after them, so the pipeline is
//! the owner that keeps the whole chain alive. Chains are always built from
//! the tail towards the head: a stage's downstream must exist before the
//! stage itself.

use crate::implementations::{log::LogStage, persist::PersistStage, validate::ValidateStage};
use crate::{get_all_implementations, Downstream, EffectSink, PipelineError, Stage, StageContext};
use flow_types::{Item, StageSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// An owned chain of stages, head first.
pub struct Pipeline {
	stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
	/// Wraps stages that were already wired together, ordered head first.
	///
	/// # Errors
	///
	/// Fails when `stages` is empty or a terminal stage is not last.
	pub fn new(stages: Vec<Arc<dyn Stage>>) -> Result<Self, PipelineError> {
		if stages.is_empty() {
			return Err(PipelineError::InvalidChain(
				"pipeline needs at least one stage".into(),
			));
		}
		if let Some(stage) = stages[..stages.len() - 1]
			.iter()
			.find(|stage| stage.is_terminal())
		{
			return Err(PipelineError::InvalidChain(format!(
				"stage '{}' is terminal and must be last",
				stage.name()
			)));
		}
		Ok(Self { stages })
	}

	/// The classic log -> validate -> persist chain.
	pub fn standard(sink: Arc<dyn EffectSink>) -> Self {
		let persist: Arc<dyn Stage> = Arc::new(PersistStage::new(Arc::clone(&sink)));
		let validate: Arc<dyn Stage> =
			Arc::new(ValidateStage::new(Arc::clone(&sink), Some(&persist)));
		let log: Arc<dyn Stage> = Arc::new(LogStage::new(sink, Some(&validate)));

		Self {
			stages: vec![log, validate, persist],
		}
	}

	/// Builds a chain from configured stage specs, ordered head first.
	///
	/// Each spec's `kind` is resolved through the registered stage
	/// implementations; the rest of its table is validated and handed to
	/// the matching factory.
	pub fn from_specs(
		specs: &[StageSpec],
		sink: Arc<dyn EffectSink>,
	) -> Result<Self, PipelineError> {
		if specs.is_empty() {
			return Err(PipelineError::InvalidChain(
				"pipeline needs at least one stage".into(),
			));
		}

		let factories: HashMap<_, _> = get_all_implementations().into_iter().collect();

		let mut built: Vec<Arc<dyn Stage>> = Vec::with_capacity(specs.len());
		for spec in specs.iter().rev() {
			let factory = factories
				.get(spec.kind.as_str())
				.ok_or_else(|| PipelineError::UnknownStage(spec.kind.clone()))?;

			let context = StageContext {
				name: spec.display_name().to_string(),
				sink: Arc::clone(&sink),
				downstream: built.last().map(Downstream::to).unwrap_or_default(),
			};
			let stage = factory(&spec.config_value(), context)?;
			tracing::debug!(stage = %stage.name(), kind = %spec.kind, "Built stage");
			built.push(stage);
		}
		built.reverse();

		Self::new(built)
	}

	/// Feeds one item into the head of the chain.
	pub fn handle(&self, item: &Item) {
		// new() and standard() guarantee at least one stage
		if let Some(head) = self.stages.first() {
			head.handle(item);
		}
	}

	/// Stages in chain order, head first.
	pub fn stages(&self) -> &[Arc<dyn Stage>] {
		&self.stages
	}

	/// Stage names in chain order.
	pub fn stage_names(&self) -> Vec<&str> {
		self.stages.iter().map(|stage| stage.name()).collect()
	}
}

impl std::fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Pipeline")
			.field("stages", &self.stage_names())
			.finish()
	}
}
