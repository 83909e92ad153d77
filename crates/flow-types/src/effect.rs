//! Effect records emitted by pipeline stages.
//!
//! Stages have no return value; everything they do is observable only
//! through the records they hand to their sink.

use crate::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of side effect a stage performed for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
	/// The item was recorded by a log stage.
	Logged,
	/// The item passed validation.
	Valid,
	/// The item failed validation and was dropped.
	Invalid,
	/// The item reached a persist stage.
	Saved,
	/// The item was transformed by a process stage.
	Processed,
}

impl EffectKind {
	/// Default line prefix used when rendering a record of this kind.
	pub fn label(&self) -> &'static str {
		match self {
			EffectKind::Logged => "LOG",
			EffectKind::Valid => "VALID",
			EffectKind::Invalid => "INVALID",
			EffectKind::Saved => "SAVED TO DB",
			EffectKind::Processed => "Processed",
		}
	}
}

impl fmt::Display for EffectKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			EffectKind::Logged => "logged",
			EffectKind::Valid => "valid",
			EffectKind::Invalid => "invalid",
			EffectKind::Saved => "saved",
			EffectKind::Processed => "processed",
		};
		f.write_str(name)
	}
}

/// A single observable effect of a stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
	/// Name of the stage that produced the record.
	pub stage: String,
	/// What the stage did.
	pub kind: EffectKind,
	/// The item the stage acted on.
	pub item: Item,
	/// Optional line prefix overriding the kind's label.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
}

impl EffectRecord {
	pub fn new(stage: impl Into<String>, kind: EffectKind, item: Item) -> Self {
		Self {
			stage: stage.into(),
			kind,
			item,
			label: None,
		}
	}

	/// Replaces the rendered prefix, e.g. a log stage configured with its own tag.
	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}
}

impl fmt::Display for EffectRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = self.label.as_deref().unwrap_or(self.kind.label());
		write!(f, "{}: {}", label, self.item)
	}
}
