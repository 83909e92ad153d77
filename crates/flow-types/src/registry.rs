//! Registry trait for self-registering stage implementations.

/// Base trait for implementation registries.
///
/// Each stage implementation module provides a `Registry` struct that
/// implements this trait, declaring the `kind` name used in pipeline
/// configuration and the factory that builds the stage.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `kind = "validate"` in a `[[pipeline.stages]]` entry.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
