//! Order lifecycle management.
//!
//! This crate provides the finite state machine that drives an order through
//! its fulfillment lifecycle, plus a shared handle that makes each transition
//! atomic when the same order is driven from several threads or tasks.

pub mod machine;
pub mod shared;

pub use machine::OrderStateMachine;
pub use shared::SharedOrder;
