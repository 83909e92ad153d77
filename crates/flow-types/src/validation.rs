//! Configuration validation for stage tables.
//!
//! Each stage implementation describes the keys it accepts with a [`Schema`].
//! The pipeline builder validates a stage's TOML table against that schema
//! before calling the stage factory, so factories can read values without
//! re-checking types.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
	/// Error that occurs when a field is not part of the schema.
	#[error("Unknown field: {0}")]
	UnknownField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Represents the type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	/// A string value, optionally required to be non-empty.
	String { non_empty: bool },
}

impl FieldType {
	fn check(&self, field: &str, value: &toml::Value) -> Result<(), ValidationError> {
		match self {
			FieldType::String { non_empty } => {
				let s = value
					.as_str()
					.ok_or_else(|| ValidationError::TypeMismatch {
						field: field.to_string(),
						expected: "string".to_string(),
						actual: value.type_str().to_string(),
					})?;
				if *non_empty && s.trim().is_empty() {
					return Err(ValidationError::InvalidValue {
						field: field.to_string(),
						message: "must not be empty".into(),
					});
				}
			},
		}

		Ok(())
	}
}

/// Custom check run after the type check passes.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a [`Schema`].
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator to this field.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn validate(&self, value: &toml::Value) -> Result<(), ValidationError> {
		self.field_type.check(&self.name, value)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Validation schema for one stage table.
///
/// Every stage setting is optional. Keys that are not declared are rejected,
/// which catches typos in stage configuration early.
#[derive(Debug)]
pub struct Schema {
	pub fields: Vec<Field>,
}

impl Schema {
	pub fn new(fields: Vec<Field>) -> Self {
		Self { fields }
	}

	/// A schema that accepts only an empty table.
	pub fn empty() -> Self {
		Self::new(vec![])
	}

	/// Validates a TOML table against this schema.
	///
	/// # Errors
	///
	/// Returns an error if the value is not a table, a key is not declared,
	/// a field has the wrong type, or a custom validator rejects the value.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for (key, value) in table {
			let field = self
				.fields
				.iter()
				.find(|field| &field.name == key)
				.ok_or_else(|| ValidationError::UnknownField(key.clone()))?;
			field.validate(value)?;
		}

		Ok(())
	}
}

/// A configuration schema that can validate TOML values.
///
/// Stage implementations return one of these so callers can validate a
/// table without knowing the concrete stage type.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

impl ConfigSchema for Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::validate(self, config)
	}
}
