//! Stage specifications as they appear in configuration.

use serde::{Deserialize, Serialize};

/// One `[[pipeline.stages]]` entry.
///
/// `kind` selects the stage implementation; every other key in the table is
/// handed to that implementation's factory as its configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StageSpec {
	/// Registered implementation name, e.g. "log" or "validate".
	pub kind: String,
	/// Display name for records; defaults to the kind.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Implementation-specific settings.
	#[serde(flatten)]
	pub config: toml::Table,
}

impl StageSpec {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			name: None,
			config: toml::Table::new(),
		}
	}

	/// Name used in effect records and logs.
	pub fn display_name(&self) -> &str {
		self.name.as_deref().unwrap_or(&self.kind)
	}

	/// The implementation settings as a TOML table value.
	pub fn config_value(&self) -> toml::Value {
		toml::Value::Table(self.config.clone())
	}
}
