//! Drives the configured pipeline, order scripts and record stream.
//!
//! The three parts are independent: items go through the stage chain, each
//! order script runs against its own order, and the record stream is
//! transformed and filtered. They run concurrently and the runner collects
//! what happened into a [`RunSummary`].

use flow_config::{Config, OrderScriptConfig, RecordsConfig};
use flow_order::SharedOrder;
use flow_pipeline::{filter_min_price, transform, EffectSink, Pipeline, Record};
use flow_types::{EffectKind, EffectRecord, Item, OrderState};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur while running the service.
#[derive(Debug, Error)]
pub enum RunnerError {
	#[error("Pipeline error: {0}")]
	Pipeline(String),
	#[error("Task error: {0}")]
	Task(String),
}

/// What a run did, for logging and inspection.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
	pub service_id: String,
	/// Items fed into the pipeline head.
	pub items: usize,
	/// Number of effect records per kind.
	pub effects: BTreeMap<EffectKind, usize>,
	/// Final state of each order script.
	pub orders: BTreeMap<String, OrderState>,
	/// Records that passed the price filter.
	pub records: Vec<Record>,
	/// Rows that could not be transformed.
	pub record_errors: Vec<String>,
}

/// Sink wrapper that counts records per kind before passing them on.
struct CountingSink {
	inner: Arc<dyn EffectSink>,
	counts: Mutex<BTreeMap<EffectKind, usize>>,
}

impl CountingSink {
	fn new(inner: Arc<dyn EffectSink>) -> Self {
		Self {
			inner,
			counts: Mutex::new(BTreeMap::new()),
		}
	}

	fn counts(&self) -> BTreeMap<EffectKind, usize> {
		self.counts
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl EffectSink for CountingSink {
	fn emit(&self, record: EffectRecord) {
		*self
			.counts
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.entry(record.kind)
			.or_insert(0) += 1;
		self.inner.emit(record);
	}
}

/// Runs one configuration against an effect sink.
pub struct FlowRunner {
	config: Config,
	sink: Arc<CountingSink>,
}

impl FlowRunner {
	pub fn new(config: Config, sink: Arc<dyn EffectSink>) -> Self {
		Self {
			config,
			sink: Arc::new(CountingSink::new(sink)),
		}
	}

	/// Builds the pipeline and runs every configured part to completion.
	#[instrument(skip_all, fields(service = %self.config.service.id))]
	pub async fn run(&self) -> Result<RunSummary, RunnerError> {
		let sink: Arc<dyn EffectSink> = self.sink.clone();
		let pipeline = Pipeline::from_specs(&self.config.pipeline.stages, sink)
			.map_err(|e| RunnerError::Pipeline(e.to_string()))?;
		tracing::info!(stages = ?pipeline.stage_names(), "Built pipeline");

		let (items, orders, records) = tokio::join!(
			feed_items(
				Arc::new(pipeline),
				self.config.pipeline.items.clone(),
				self.config.service.workers
			),
			run_orders(&self.config.orders),
			run_record_stream(self.config.records.clone()),
		);
		let (records, record_errors) = records?;

		Ok(RunSummary {
			service_id: self.config.service.id.clone(),
			items: items?,
			effects: self.sink.counts(),
			orders: orders?,
			records,
			record_errors,
		})
	}
}

/// Splits items into contiguous chunks, one blocking task per chunk.
///
/// Within a chunk items are handled in order; a single worker therefore
/// preserves the configured order exactly.
async fn feed_items(
	pipeline: Arc<Pipeline>,
	items: Vec<Item>,
	workers: usize,
) -> Result<usize, RunnerError> {
	if items.is_empty() {
		return Ok(0);
	}

	let chunk_size = items.len().div_ceil(workers.max(1));
	let tasks = items.chunks(chunk_size).map(|chunk| {
		let pipeline = Arc::clone(&pipeline);
		let chunk = chunk.to_vec();
		tokio::task::spawn_blocking(move || {
			for item in &chunk {
				pipeline.handle(item);
			}
			chunk.len()
		})
	});

	let mut fed = 0;
	for result in futures::future::join_all(tasks).await {
		fed += result.map_err(|e| RunnerError::Task(e.to_string()))?;
	}
	tracing::debug!(items = fed, workers, "Fed pipeline");
	Ok(fed)
}

/// Runs each order script against a fresh order on its own task.
async fn run_orders(
	scripts: &BTreeMap<String, OrderScriptConfig>,
) -> Result<BTreeMap<String, OrderState>, RunnerError> {
	let tasks = scripts.iter().map(|(name, script)| {
		let name = name.clone();
		let actions = script.actions.clone();
		tokio::spawn(async move {
			let order = SharedOrder::new();
			tracing::info!(order = %name, state = %order.peek(), "Order created");
			for action in &actions {
				let (before, after) = order.transition(action);
				if before == after {
					tracing::info!(order = %name, action = %action, state = %after, "Action ignored");
				} else {
					tracing::info!(order = %name, action = %action, state = %after, "Order updated");
				}
			}
			(name, order.peek())
		})
	});

	let mut states = BTreeMap::new();
	for result in futures::future::join_all(tasks).await {
		let (name, state) = result.map_err(|e| RunnerError::Task(e.to_string()))?;
		states.insert(name, state);
	}
	Ok(states)
}

/// Runs the record stream on a blocking task, if one is configured.
async fn run_record_stream(
	config: Option<RecordsConfig>,
) -> Result<(Vec<Record>, Vec<String>), RunnerError> {
	let Some(config) = config else {
		return Ok(Default::default());
	};
	tokio::task::spawn_blocking(move || run_records(&config))
		.await
		.map_err(|e| RunnerError::Task(e.to_string()))
}

/// Transforms and filters the configured rows, logging rows that fail.
fn run_records(config: &RecordsConfig) -> (Vec<Record>, Vec<String>) {
	let mut kept = Vec::new();
	let mut errors = Vec::new();

	for result in filter_min_price(transform(config.rows.clone()), config.min_price) {
		match result {
			Ok(record) => {
				tracing::info!(
					price = ?record.price,
					processed_date = ?record.processed_date,
					"Record kept: {:?}",
					record.fields
				);
				kept.push(record);
			},
			Err(e) => {
				tracing::warn!("Skipping record: {}", e);
				errors.push(e.to_string());
			},
		}
	}

	(kept, errors)
}
