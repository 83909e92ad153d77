//! Lazy record stream: transform raw rows, then filter by price.
//!
//! Rows arrive as string maps (what a CSV reader would yield). `transform`
//! parses the price and derives a processed date; `filter_min_price` keeps
//! rows at or above a price floor. Both are iterator adaptors, so nothing is
//! computed until the caller pulls a record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A row as read from the source, every value still a string.
pub type RawRecord = BTreeMap<String, String>;

/// Errors that can occur while transforming a row.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
	/// The `price` column is not a number.
	#[error("Invalid price '{value}' in record {index}")]
	InvalidPrice { index: usize, value: String },
}

/// A transformed row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
	/// Columns other than `price`, unchanged.
	pub fields: BTreeMap<String, String>,
	/// Parsed `price` column, if the row had one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	/// `parsed_<date>` when the row had a `date` column.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub processed_date: Option<String>,
}

impl Record {
	pub fn get(&self, column: &str) -> Option<&str> {
		self.fields.get(column).map(String::as_str)
	}
}

fn transform_one(index: usize, mut row: RawRecord) -> Result<Record, RecordError> {
	let price = match row.remove("price") {
		Some(value) => Some(
			value
				.trim()
				.parse::<f64>()
				.map_err(|_| RecordError::InvalidPrice { index, value })?,
		),
		None => None,
	};
	let processed_date = row.get("date").map(|date| format!("parsed_{}", date));

	Ok(Record {
		fields: row,
		price,
		processed_date,
	})
}

/// Parses each row as it is pulled.
pub fn transform<I>(rows: I) -> impl Iterator<Item = Result<Record, RecordError>>
where
	I: IntoIterator<Item = RawRecord>,
{
	rows.into_iter()
		.enumerate()
		.map(|(index, row)| transform_one(index, row))
}

/// Keeps records whose price is at least `min_price`.
///
/// Records without a price count as 0. Errors pass through untouched so the
/// caller decides what to do with bad rows.
pub fn filter_min_price<I>(
	records: I,
	min_price: f64,
) -> impl Iterator<Item = Result<Record, RecordError>>
where
	I: IntoIterator<Item = Result<Record, RecordError>>,
{
	records.into_iter().filter(move |record| match record {
		Ok(record) => record.price.unwrap_or(0.0) >= min_price,
		Err(_) => true,
	})
}
