//! Configuration module for the flow service.
//!
//! This module provides the structures and loading logic for the service
//! configuration. Configuration is read from TOML, environment variables are
//! substituted before parsing, and the result is validated so the service can
//! build pipelines and order scripts without re-checking anything.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

pub use loader::ConfigLoader;

use flow_types::{Item, StageSpec};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on concurrent pipeline workers.
const MAX_WORKERS: usize = 64;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the flow service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Service identity and runtime settings.
	pub service: ServiceConfig,
	/// Stage chain and the items to feed through it.
	#[serde(default)]
	pub pipeline: PipelineConfig,
	/// Named order scripts, each driving its own order.
	#[serde(default)]
	pub orders: BTreeMap<String, OrderScriptConfig>,
	/// Optional record stream to transform and filter.
	pub records: Option<RecordsConfig>,
}

/// Configuration specific to the service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Number of tasks feeding pipeline items concurrently.
	/// With a single worker items are handled strictly in order.
	#[serde(default = "default_workers")]
	pub workers: usize,
}

/// Returns the default number of pipeline workers.
fn default_workers() -> usize {
	1
}

/// Configuration of the stage pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
	/// Stages in chain order, head first.
	#[serde(default = "default_stages")]
	pub stages: Vec<StageSpec>,
	/// Items fed into the head of the chain.
	#[serde(default)]
	pub items: Vec<Item>,
}

impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			stages: default_stages(),
			items: Vec::new(),
		}
	}
}

/// Returns the log -> validate -> persist chain.
fn default_stages() -> Vec<StageSpec> {
	["log", "validate", "persist"]
		.into_iter()
		.map(StageSpec::new)
		.collect()
}

/// A sequence of actions applied to a fresh order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderScriptConfig {
	/// Action names; names outside the vocabulary are no-ops.
	pub actions: Vec<String>,
}

/// Configuration for the record stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordsConfig {
	/// Records priced below this are dropped.
	#[serde(default)]
	pub min_price: f64,
	/// Raw rows, every value a string.
	#[serde(default)]
	pub rows: Vec<BTreeMap<String, String>>,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = ConfigLoader::new(base_dir);
		let file_name = path.file_name().ok_or_else(|| {
			ConfigError::Validation(format!("Invalid path: {}", path.display()))
		})?;
		loader.load_config(file_name).await
	}

	/// Parses and validates text whose environment variables are already
	/// resolved. Values that came from the environment are taken literally.
	pub(crate) fn parse_resolved(resolved: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(resolved)?;
		config.validate()?;
		Ok(config)
	}

	/// Validates the configuration.
	///
	/// - Service ID must not be empty
	/// - Worker count must be between 1 and 64
	/// - The pipeline needs at least one stage, each with a kind and a
	///   name unique within the chain
	/// - Order script names must not be empty
	/// - The record price floor must be a finite, non-negative number
	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}
		if self.service.workers == 0 {
			return Err(ConfigError::Validation(
				"Service workers must be at least 1".into(),
			));
		}
		if self.service.workers > MAX_WORKERS {
			return Err(ConfigError::Validation(format!(
				"Service workers cannot exceed {}",
				MAX_WORKERS
			)));
		}

		if self.pipeline.stages.is_empty() {
			return Err(ConfigError::Validation(
				"At least one pipeline stage must be configured".into(),
			));
		}
		let mut names = HashSet::new();
		for (index, stage) in self.pipeline.stages.iter().enumerate() {
			if stage.kind.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Pipeline stage {} is missing a kind",
					index
				)));
			}
			if !names.insert(stage.display_name()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate pipeline stage name '{}'",
					stage.display_name()
				)));
			}
		}

		if self.orders.keys().any(|name| name.trim().is_empty()) {
			return Err(ConfigError::Validation(
				"Order script names cannot be empty".into(),
			));
		}

		if let Some(records) = &self.records {
			if !records.min_price.is_finite() || records.min_price < 0.0 {
				return Err(ConfigError::Validation(format!(
					"Records min_price must be a non-negative number, got {}",
					records.min_price
				)));
			}
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved first and the configuration is
/// validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse_resolved(&resolve_env_vars(s)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("FLOW_TEST_HOST", "localhost");
		std::env::set_var("FLOW_TEST_PORT", "5432");

		let input = "host = \"${FLOW_TEST_HOST}:${FLOW_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("FLOW_TEST_HOST");
		std::env::remove_var("FLOW_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${FLOW_TEST_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${FLOW_TEST_MISSING_NO_DEFAULT}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("FLOW_TEST_MISSING_NO_DEFAULT"));
	}

	#[test]
	fn test_minimal_config_uses_defaults() {
		let config: Config = "[service]\nid = \"flow\"".parse().unwrap();
		assert_eq!(config.service.workers, 1);
		let kinds: Vec<_> = config
			.pipeline
			.stages
			.iter()
			.map(|s| s.kind.as_str())
			.collect();
		assert_eq!(kinds, vec!["log", "validate", "persist"]);
		assert!(config.pipeline.items.is_empty());
		assert!(config.orders.is_empty());
		assert!(config.records.is_none());
	}

	#[test]
	fn test_full_config() {
		let config: Config = r#"
[service]
id = "demo"
workers = 2

[pipeline]
items = ["hello", "hi", 42, "python"]

[[pipeline.stages]]
kind = "log"
prefix = "AUDIT"

[[pipeline.stages]]
kind = "validate"

[[pipeline.stages]]
kind = "persist"
table = "orders"

[orders.happy]
actions = ["pay", "ship", "deliver"]

[orders.cancelled]
actions = ["cancel", "pay"]

[records]
min_price = 10.0
[[records.rows]]
name = "item1"
price = "10.50"
date = "2023-01-01"
"#
		.parse()
		.unwrap();

		assert_eq!(config.service.workers, 2);
		assert_eq!(config.pipeline.items.len(), 4);
		assert_eq!(config.pipeline.items[2], Item::Integer(42));
		assert_eq!(
			config.pipeline.stages[0]
				.config
				.get("prefix")
				.and_then(|v| v.as_str()),
			Some("AUDIT")
		);
		assert_eq!(config.orders["happy"].actions, vec!["pay", "ship", "deliver"]);
		let records = config.records.unwrap();
		assert_eq!(records.min_price, 10.0);
		assert_eq!(records.rows[0]["price"], "10.50");
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("FLOW_TEST_SERVICE_ID", "from-env");
		let config: Config = "[service]\nid = \"${FLOW_TEST_SERVICE_ID}\"\nworkers = ${FLOW_TEST_WORKERS:-3}"
			.parse()
			.unwrap();
		assert_eq!(config.service.id, "from-env");
		assert_eq!(config.service.workers, 3);
		std::env::remove_var("FLOW_TEST_SERVICE_ID");
	}

	#[test]
	fn test_validation_failures() {
		let cases = [
			("[service]\nid = \"\"", "Service ID"),
			("[service]\nid = \"x\"\nworkers = 0", "at least 1"),
			("[service]\nid = \"x\"\nworkers = 65", "cannot exceed"),
			("[service]\nid = \"x\"\n[pipeline]\nstages = []", "At least one pipeline stage"),
			(
				"[service]\nid = \"x\"\n[[pipeline.stages]]\nkind = \"log\"\n[[pipeline.stages]]\nkind = \"log\"",
				"Duplicate pipeline stage",
			),
			("[service]\nid = \"x\"\n[records]\nmin_price = -1.0", "min_price"),
		];

		for (input, expected) in cases {
			let err = input.parse::<Config>().unwrap_err().to_string();
			assert!(err.contains(expected), "'{}' did not mention '{}'", err, expected);
		}
	}

	#[test]
	fn test_parse_error_is_concise() {
		let err = "[service\nid = 1".parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}
}
