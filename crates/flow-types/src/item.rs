//! Pipeline item values.
//!
//! An item is an opaque value with no identity beyond its contents. Stages
//! only ever look at its textual form and whether it is "empty".

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value flowing through a stage pipeline.
///
/// Items deserialize untagged, so `"hello"`, `42` and `10.5` in a TOML or
/// JSON document map directly to the matching variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
	/// A whole number.
	Integer(i64),
	/// A floating point number.
	Float(f64),
	/// A string value.
	Text(String),
}

impl Item {
	/// Returns false for the empty string and for numeric zero.
	pub fn is_truthy(&self) -> bool {
		match self {
			Item::Text(s) => !s.is_empty(),
			Item::Integer(n) => *n != 0,
			Item::Float(f) => *f != 0.0,
		}
	}

	/// Length of the item's string form, counted in characters.
	pub fn display_len(&self) -> usize {
		match self {
			Item::Text(s) => s.chars().count(),
			other => other.to_string().chars().count(),
		}
	}
}

impl fmt::Display for Item {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Item::Text(s) => f.write_str(s),
			Item::Integer(n) => write!(f, "{}", n),
			Item::Float(v) => fmt_float(*v, f),
		}
	}
}

/// Shortest round-trip form. Decimal exponents from -4 to 15 print
/// positionally, whole values keeping one fractional digit (`5.0`); the rest
/// use a signed two-digit exponent (`1e+16`, `1.5e-05`).
fn fmt_float(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
	if v.is_nan() {
		return f.write_str("nan");
	}
	if v.is_infinite() {
		return f.write_str(if v < 0.0 { "-inf" } else { "inf" });
	}

	let scientific = format!("{:e}", v);
	let Some((mantissa, exponent)) = scientific
		.split_once('e')
		.and_then(|(m, e)| e.parse::<i32>().ok().map(|e| (m, e)))
	else {
		return write!(f, "{}", v);
	};

	if (-4..16).contains(&exponent) {
		if v.fract() == 0.0 {
			write!(f, "{:.1}", v)
		} else {
			write!(f, "{}", v)
		}
	} else {
		let sign = if exponent < 0 { '-' } else { '+' };
		write!(f, "{}e{}{:02}", mantissa, sign, exponent.abs())
	}
}

impl From<&str> for Item {
	fn from(value: &str) -> Self {
		Item::Text(value.to_string())
	}
}

impl From<String> for Item {
	fn from(value: String) -> Self {
		Item::Text(value)
	}
}

impl From<i64> for Item {
	fn from(value: i64) -> Self {
		Item::Integer(value)
	}
}

impl From<f64> for Item {
	fn from(value: f64) -> Self {
		Item::Float(value)
	}
}
