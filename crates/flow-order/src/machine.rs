//! Order state machine implementation.
//!
//! Orders move through pending -> paid -> shipped -> delivered, with
//! cancellation possible before payment and refund possible before shipping.
//! Actions that have no edge from the current state leave the order as it
//! is; the machine never reports an error.

use flow_types::{OrderAction, OrderState};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Static transition table keyed by (current state, action).
static TRANSITIONS: Lazy<HashMap<(OrderState, OrderAction), OrderState>> = Lazy::new(|| {
	HashMap::from([
		((OrderState::Pending, OrderAction::Pay), OrderState::Paid),
		((OrderState::Pending, OrderAction::Cancel), OrderState::Cancelled),
		((OrderState::Paid, OrderAction::Ship), OrderState::Shipped),
		((OrderState::Paid, OrderAction::Refund), OrderState::Refunded),
		((OrderState::Shipped, OrderAction::Deliver), OrderState::Delivered),
	])
});

/// A single order driven by named actions.
///
/// Construction leaves the machine ready for its first action; there is no
/// separate start step.
#[derive(Debug, Clone, Default)]
pub struct OrderStateMachine {
	state: OrderState,
}

impl OrderStateMachine {
	/// Creates an order in the `pending` state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the current state without applying any action.
	pub fn peek(&self) -> OrderState {
		self.state
	}

	/// Applies a named action and returns the resulting state.
	///
	/// Strings outside the action vocabulary are treated exactly like an
	/// action with no edge from the current state.
	pub fn apply(&mut self, action: &str) -> OrderState {
		match action.parse::<OrderAction>() {
			Ok(action) => self.apply_action(action),
			Err(e) => {
				tracing::debug!(state = %self.state, "Ignoring action: {}", e);
				self.state
			},
		}
	}

	/// Applies a typed action and returns the resulting state.
	pub fn apply_action(&mut self, action: OrderAction) -> OrderState {
		match Self::next_state(self.state, action) {
			Some(next) => {
				tracing::debug!(from = %self.state, to = %next, action = %action, "Order transitioned");
				self.state = next;
			},
			None => {
				tracing::debug!(
					state = %self.state,
					action = %action,
					"Action has no transition from current state"
				);
			},
		}
		self.state
	}

	/// Looks up the destination of `action` from `state`, if any.
	pub fn next_state(state: OrderState, action: OrderAction) -> Option<OrderState> {
		TRANSITIONS.get(&(state, action)).copied()
	}

	/// Whether the order has reached a state it can never leave.
	pub fn is_terminal(&self) -> bool {
		self.state.is_terminal()
	}

	/// Actions that would change the current state.
	pub fn allowed_actions(&self) -> Vec<OrderAction> {
		OrderAction::ALL
			.into_iter()
			.filter(|action| Self::next_state(self.state, *action).is_some())
			.collect()
	}

	/// Applies each action in turn, returning the state after every step.
	pub fn run_script<S: AsRef<str>>(&mut self, actions: &[S]) -> Vec<OrderState> {
		actions
			.iter()
			.map(|action| self.apply(action.as_ref()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_happy_path_to_delivered() {
		let mut order = OrderStateMachine::new();
		assert_eq!(order.peek(), OrderState::Pending);
		assert_eq!(order.apply("pay"), OrderState::Paid);
		assert_eq!(order.apply("ship"), OrderState::Shipped);
		assert_eq!(order.apply("deliver"), OrderState::Delivered);

		// Terminal state is absorbing
		assert_eq!(order.apply("pay"), OrderState::Delivered);
		assert!(order.is_terminal());
	}

	#[test]
	fn test_cancel_is_absorbing() {
		let mut order = OrderStateMachine::new();
		assert_eq!(order.apply("cancel"), OrderState::Cancelled);
		assert_eq!(order.apply("pay"), OrderState::Cancelled);
		assert!(order.allowed_actions().is_empty());
	}

	#[test]
	fn test_refund_after_payment() {
		let mut order = OrderStateMachine::new();
		order.apply("pay");
		assert_eq!(order.apply("refund"), OrderState::Refunded);
		assert_eq!(order.apply("ship"), OrderState::Refunded);
	}

	#[test]
	fn test_invalid_actions_are_noops() {
		let mut order = OrderStateMachine::new();
		assert_eq!(order.apply("ship"), OrderState::Pending);
		assert_eq!(order.apply("deliver"), OrderState::Pending);
		assert_eq!(order.apply("refund"), OrderState::Pending);
		assert_eq!(order.apply("teleport"), OrderState::Pending);
		assert_eq!(order.apply(""), OrderState::Pending);
		assert_eq!(order.apply("Pay"), OrderState::Pending);

		order.apply("pay");
		assert_eq!(order.apply("cancel"), OrderState::Paid);
		assert_eq!(order.apply("pay"), OrderState::Paid);
	}

	#[test]
	fn test_peek_is_idempotent() {
		let mut order = OrderStateMachine::new();
		for _ in 0..5 {
			assert_eq!(order.peek(), OrderState::Pending);
		}
		order.apply("pay");
		for _ in 0..5 {
			assert_eq!(order.peek(), OrderState::Paid);
		}
	}

	#[test]
	fn test_every_pair_follows_table() {
		let states = [
			OrderState::Pending,
			OrderState::Paid,
			OrderState::Shipped,
			OrderState::Cancelled,
			OrderState::Refunded,
			OrderState::Delivered,
		];
		for state in states {
			for action in OrderAction::ALL {
				let mut order = OrderStateMachine { state };
				let expected = OrderStateMachine::next_state(state, action).unwrap_or(state);
				assert_eq!(order.apply(action.as_str()), expected, "{} + {}", state, action);
				if state.is_terminal() {
					assert_eq!(expected, state);
				}
			}
		}
	}

	#[test]
	fn test_allowed_actions() {
		let mut order = OrderStateMachine::new();
		assert_eq!(
			order.allowed_actions(),
			vec![OrderAction::Pay, OrderAction::Cancel]
		);
		order.apply("pay");
		assert_eq!(
			order.allowed_actions(),
			vec![OrderAction::Ship, OrderAction::Refund]
		);
		order.apply("ship");
		assert_eq!(order.allowed_actions(), vec![OrderAction::Deliver]);
	}

	#[test]
	fn test_run_script() {
		let mut order = OrderStateMachine::new();
		let states = order.run_script(&["pay", "bogus", "ship", "deliver", "refund"]);
		assert_eq!(
			states,
			vec![
				OrderState::Paid,
				OrderState::Paid,
				OrderState::Shipped,
				OrderState::Delivered,
				OrderState::Delivered,
			]
		);
	}
}
