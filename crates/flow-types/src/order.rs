//! Order lifecycle vocabulary.
//!
//! Defines the closed set of order states and the actions that drive
//! transitions between them. The transition table itself lives with the
//! state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status of an order in the fulfillment lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
	/// Initial state of every order.
	#[default]
	Pending,
	/// Payment received.
	Paid,
	/// Handed over for delivery.
	Shipped,
	/// Cancelled before payment. Terminal.
	Cancelled,
	/// Refunded after payment. Terminal.
	Refunded,
	/// Delivered to the customer. Terminal.
	Delivered,
}

impl OrderState {
	/// Terminal states have no outgoing transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderState::Cancelled | OrderState::Refunded | OrderState::Delivered
		)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			OrderState::Pending => "pending",
			OrderState::Paid => "paid",
			OrderState::Shipped => "shipped",
			OrderState::Cancelled => "cancelled",
			OrderState::Refunded => "refunded",
			OrderState::Delivered => "delivered",
		}
	}
}

impl fmt::Display for OrderState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Actions that may move an order between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
	Pay,
	Cancel,
	Ship,
	Refund,
	Deliver,
}

impl OrderAction {
	/// Every action in the vocabulary.
	pub const ALL: [OrderAction; 5] = [
		OrderAction::Pay,
		OrderAction::Cancel,
		OrderAction::Ship,
		OrderAction::Refund,
		OrderAction::Deliver,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			OrderAction::Pay => "pay",
			OrderAction::Cancel => "cancel",
			OrderAction::Ship => "ship",
			OrderAction::Refund => "refund",
			OrderAction::Deliver => "deliver",
		}
	}
}

impl fmt::Display for OrderAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when a string is not part of the action vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown order action: {0}")]
pub struct ParseActionError(pub String);

impl FromStr for OrderAction {
	type Err = ParseActionError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		OrderAction::ALL
			.into_iter()
			.find(|action| action.as_str() == s)
			.ok_or_else(|| ParseActionError(s.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_terminal_states() {
		assert!(!OrderState::Pending.is_terminal());
		assert!(!OrderState::Paid.is_terminal());
		assert!(!OrderState::Shipped.is_terminal());
		assert!(OrderState::Cancelled.is_terminal());
		assert!(OrderState::Refunded.is_terminal());
		assert!(OrderState::Delivered.is_terminal());
	}

	#[test]
	fn test_action_parsing() {
		assert_eq!("pay".parse::<OrderAction>(), Ok(OrderAction::Pay));
		assert_eq!("deliver".parse::<OrderAction>(), Ok(OrderAction::Deliver));
		assert!("PAY".parse::<OrderAction>().is_err());
		assert!("teleport".parse::<OrderAction>().is_err());
	}

	#[test]
	fn test_state_serializes_lowercase() {
		let json = serde_json::to_string(&OrderState::Cancelled).unwrap();
		assert_eq!(json, "\"cancelled\"");
		assert_eq!(OrderState::default(), OrderState::Pending);
	}
}
