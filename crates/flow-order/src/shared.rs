//! Thread-safe handle around an order state machine.

use crate::OrderStateMachine;
use flow_types::{OrderAction, OrderState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to one order shared between callers.
///
/// Every `apply` holds the lock for the whole lookup-and-update, so two
/// concurrent callers can never both act on the same prior state.
#[derive(Debug, Clone, Default)]
pub struct SharedOrder {
	inner: Arc<Mutex<OrderStateMachine>>,
}

impl SharedOrder {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, OrderStateMachine> {
		// The machine cannot be left half-updated, so a poisoned lock is still usable
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn peek(&self) -> OrderState {
		self.lock().peek()
	}

	pub fn apply(&self, action: &str) -> OrderState {
		self.lock().apply(action)
	}

	/// Applies `action` and returns the states before and after it, both
	/// read under the same lock. `before != after` means this call took
	/// the edge.
	pub fn transition(&self, action: &str) -> (OrderState, OrderState) {
		let mut machine = self.lock();
		let before = machine.peek();
		(before, machine.apply(action))
	}

	pub fn apply_action(&self, action: OrderAction) -> OrderState {
		self.lock().apply_action(action)
	}

	pub fn is_terminal(&self) -> bool {
		self.lock().is_terminal()
	}

	/// Returns a copy of the underlying machine.
	pub fn snapshot(&self) -> OrderStateMachine {
		self.lock().clone()
	}
}
