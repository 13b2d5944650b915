//! Field values and row drafts.
//!
//! A [`RowDraft`] is an in-memory candidate row: it is filled column by column
//! by the row generator, then either persisted or thrown away.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// SQL NULL.
	Null,
	/// UUID identifier.
	Uuid(Uuid),
	/// Text value.
	Text(String),
	/// Integer value.
	Integer(i64),
	/// Floating point value.
	Float(f64),
	/// Boolean value.
	Boolean(bool),
	/// Instant in UTC.
	DateTime(DateTime<Utc>),
	/// Calendar date.
	Date(NaiveDate),
	/// Time of day.
	Time(NaiveTime),
	/// Non-negative span.
	Duration(chrono::Duration),
	/// Opaque bytes, as read back from the store.
	Bytes(Vec<u8>),
}

impl FieldValue {
	/// Returns true for SQL NULL.
	pub fn is_null(&self) -> bool {
		matches!(self, FieldValue::Null)
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldValue::Null => write!(f, "NULL"),
			FieldValue::Uuid(v) => write!(f, "{}", v),
			FieldValue::Text(v) => write!(f, "{}", v),
			FieldValue::Integer(v) => write!(f, "{}", v),
			FieldValue::Float(v) => write!(f, "{}", v),
			FieldValue::Boolean(v) => write!(f, "{}", v),
			FieldValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
			FieldValue::Date(v) => write!(f, "{}", v),
			FieldValue::Time(v) => write!(f, "{}", v),
			FieldValue::Duration(v) => write!(f, "{}s", v.num_seconds()),
			FieldValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
		}
	}
}

/// Column name to value mapping for one candidate row.
///
/// Columns keep the order in which they were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowDraft {
	fields: Vec<(String, FieldValue)>,
}

impl RowDraft {
	/// Creates an empty draft.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a column, replacing any previous value.
	pub fn set(&mut self, column: impl Into<String>, value: FieldValue) {
		let column = column.into();
		match self.fields.iter_mut().find(|(name, _)| *name == column) {
			Some((_, existing)) => *existing = value,
			None => self.fields.push((column, value)),
		}
	}

	/// Returns the value of a column if it was set.
	pub fn get(&self, column: &str) -> Option<&FieldValue> {
		self.fields
			.iter()
			.find(|(name, _)| name == column)
			.map(|(_, value)| value)
	}

	/// Returns true if the column was set.
	pub fn contains(&self, column: &str) -> bool {
		self.get(column).is_some()
	}

	/// Iterates over `(column, value)` pairs in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
		self.fields.iter().map(|(name, value)| (name.as_str(), value))
	}

	/// Number of columns set.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Returns true if no column was set.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_set_replaces_existing_value() {
		let mut draft = RowDraft::new();
		draft.set("points", FieldValue::Integer(1));
		draft.set("email", FieldValue::Text("a@example.com".to_string()));
		draft.set("points", FieldValue::Integer(7));

		assert_eq!(draft.len(), 2);
		assert_eq!(draft.get("points"), Some(&FieldValue::Integer(7)));
		let columns: Vec<&str> = draft.iter().map(|(name, _)| name).collect();
		assert_eq!(columns, vec!["points", "email"]);
	}

	#[rstest]
	fn test_missing_column() {
		let draft = RowDraft::new();
		assert!(draft.is_empty());
		assert!(!draft.contains("id"));
		assert_eq!(draft.get("id"), None);
	}

	#[rstest]
	#[case(FieldValue::Null, "NULL")]
	#[case(FieldValue::Integer(42), "42")]
	#[case(FieldValue::Duration(chrono::Duration::seconds(90)), "90s")]
	#[case(FieldValue::Bytes(vec![1, 2, 3]), "<3 bytes>")]
	fn test_display(#[case] value: FieldValue, #[case] expected: &str) {
		assert_eq!(value.to_string(), expected);
	}
}
