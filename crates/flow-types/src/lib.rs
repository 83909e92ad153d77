//! Common types module for the flow workspace.
//!
//! This module defines the values that move through stage pipelines, the
//! effect records stages emit, the order lifecycle vocabulary, and the
//! configuration validation helpers shared by every stage implementation.

/// Effect records emitted by pipeline stages.
pub mod effect;
/// Values flowing through pipeline stages.
pub mod item;
/// Order lifecycle states and actions.
pub mod order;
/// Registry trait for self-registering stage implementations.
pub mod registry;
/// Stage specifications read from configuration.
pub mod stage;
/// Configuration validation types for stage tables.
pub mod validation;

pub use effect::{EffectKind, EffectRecord};
pub use item::Item;
pub use order::{OrderAction, OrderState, ParseActionError};
pub use registry::ImplementationRegistry;
pub use stage::StageSpec;
pub use validation::*;
