// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Forward-only row cursor over a record sequence.
//!
//! This is what a backend's staging transfer consumes: a positional,
//! column-ordered view of the records. Column positions match the column
//! list the cursor was built with; the staging insert must use the same
//! list or values land in the wrong columns.

use crate::{
	convert::ConverterRegistry,
	error::Result,
	record::{FieldDef, Record},
	value::Value,
};

/// Object-safe forward-only cursor handed to backend bulk writers.
///
/// Buffers nothing beyond the current record: memory is O(1) in record count
/// and O(n) in column count.
pub trait RowSource: Send {
	/// Ordered column names, matching cell positions.
	fn columns(&self) -> &[String];

	/// Declared kind of the field feeding a cell, when known. Backends
	/// whose wire format types NULL cells use this.
	fn kind(&self, index: usize) -> Option<crate::value::ValueKind> {
		let _ = index;
		None
	}

	/// Advance to the next record. Returns false when exhausted.
	fn advance(&mut self) -> bool;

	/// Whether the cell holds NULL, tested before conversion.
	fn is_null(&self, index: usize) -> bool;

	/// Read one cell, applying the registered converter for the field's
	/// declared kind.
	fn value(&self, index: usize) -> Result<Value>;

	fn string(&self, index: usize) -> Result<Option<String>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			v => Some(v.to_text()),
		})
	}

	fn int32(&self, index: usize) -> Result<Option<i32>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::Int32(v) => Some(v),
			Value::Int64(v) => i32::try_from(v).ok(),
			Value::Text(v) => v.trim().parse().ok(),
			_ => None,
		})
	}

	fn int64(&self, index: usize) -> Result<Option<i64>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::Int64(v) => Some(v),
			Value::Int32(v) => Some(i64::from(v)),
			Value::Text(v) => v.trim().parse().ok(),
			_ => None,
		})
	}

	fn decimal(&self, index: usize) -> Result<Option<bigdecimal::BigDecimal>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::Decimal(v) => Some(v),
			Value::Int32(v) => Some(bigdecimal::BigDecimal::from(v)),
			Value::Int64(v) => Some(bigdecimal::BigDecimal::from(v)),
			Value::Text(v) => v.trim().parse().ok(),
			_ => None,
		})
	}

	fn bool(&self, index: usize) -> Result<Option<bool>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::Bool(v) => Some(v),
			_ => None,
		})
	}

	fn datetime(&self, index: usize) -> Result<Option<chrono::NaiveDateTime>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::DateTime(v) => Some(v),
			Value::Date(v) => v.and_hms_opt(0, 0, 0),
			_ => None,
		})
	}

	fn guid(&self, index: usize) -> Result<Option<uuid::Uuid>> {
		Ok(match self.value(index)? {
			Value::Null => None,
			Value::Uuid(v) => Some(v),
			Value::Text(v) => uuid::Uuid::parse_str(v.trim()).ok(),
			_ => None,
		})
	}
}

/// [`RowSource`] over a slice of records.
///
/// Field lookups are resolved to [`FieldDef`]s once at construction; each
/// cell access is a direct field read plus one converter-registry lookup.
pub struct RecordCursor<'a, T: Record> {
	records: &'a [T],
	columns: Vec<String>,
	fields: Vec<&'static FieldDef>,
	converters: &'a ConverterRegistry,
	position: Option<usize>,
}

impl<'a, T: Record> RecordCursor<'a, T> {
	/// Build a cursor over `records` exposing `mapping` as its columns, in
	/// order. Each entry pairs the outgoing column name with the record
	/// field feeding it.
	pub fn new(
		records: &'a [T],
		mapping: &[(String, &'static FieldDef)],
		converters: &'a ConverterRegistry,
	) -> Self {
		Self {
			records,
			columns: mapping.iter().map(|(column, _)| column.clone()).collect(),
			fields: mapping.iter().map(|(_, field)| *field).collect(),
			converters,
			position: None,
		}
	}

	fn current(&self) -> Option<&T> {
		self.position.and_then(|p| self.records.get(p))
	}

	fn raw(&self, index: usize) -> Value {
		match (self.current(), self.fields.get(index)) {
			(Some(record), Some(field)) => record.get(field.name),
			_ => Value::Null,
		}
	}
}

impl<T: Record> RowSource for RecordCursor<'_, T> {
	fn columns(&self) -> &[String] {
		&self.columns
	}

	fn kind(&self, index: usize) -> Option<crate::value::ValueKind> {
		self.fields.get(index).map(|field| field.kind)
	}

	fn advance(&mut self) -> bool {
		let next = self.position.map_or(0, |p| p + 1);
		self.position = Some(next);
		next < self.records.len()
	}

	fn is_null(&self, index: usize) -> bool {
		self.raw(index).is_null()
	}

	fn value(&self, index: usize) -> Result<Value> {
		let field = match self.fields.get(index) {
			Some(field) => field,
			None => return Ok(Value::Null),
		};
		self.converters.apply(field.kind, self.raw(index))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::{IntoValue, ValueKind};

	struct Row {
		id: i64,
		name: String,
		age: Option<i32>,
	}

	const ROW_FIELDS: &[FieldDef] = &[
		FieldDef {
			name: "id",
			column: "id",
			kind: ValueKind::Int64,
			key: true,
		},
		FieldDef {
			name: "name",
			column: "name",
			kind: ValueKind::Text,
			key: false,
		},
		FieldDef {
			name: "age",
			column: "age",
			kind: ValueKind::Int32,
			key: false,
		},
	];

	impl Record for Row {
		fn table() -> &'static str {
			"Row"
		}

		fn fields() -> &'static [FieldDef] {
			ROW_FIELDS
		}

		fn get(&self, field: &str) -> Value {
			match field {
				"id" => self.id.into_value(),
				"name" => self.name.clone().into_value(),
				"age" => self.age.into_value(),
				_ => Value::Null,
			}
		}

		fn set(&mut self, field: &str, value: Value) {
			if field == "id" {
				if let Value::Int64(v) = value {
					self.id = v;
				}
			}
		}
	}

	fn mapping() -> Vec<(String, &'static FieldDef)> {
		ROW_FIELDS.iter().map(|f| (f.column.to_string(), f)).collect()
	}

	#[test]
	fn iterates_in_input_order() {
		let rows = vec![
			Row {
				id: 1,
				name: "a".into(),
				age: Some(10),
			},
			Row {
				id: 2,
				name: "b".into(),
				age: None,
			},
		];
		let converters = ConverterRegistry::new();
		let mut cursor = RecordCursor::new(&rows, &mapping(), &converters);

		assert!(cursor.advance());
		assert_eq!(cursor.int64(0).unwrap(), Some(1));
		assert_eq!(cursor.string(1).unwrap(), Some("a".into()));
		assert_eq!(cursor.int32(2).unwrap(), Some(10));

		assert!(cursor.advance());
		assert_eq!(cursor.int64(0).unwrap(), Some(2));
		assert!(cursor.is_null(2));
		assert_eq!(cursor.int32(2).unwrap(), None);

		assert!(!cursor.advance());
	}

	#[test]
	fn column_positions_match_mapping_order() {
		let rows = vec![Row {
			id: 7,
			name: "x".into(),
			age: Some(3),
		}];
		// Reverse the column order; cells must follow
		let mut reversed = mapping();
		reversed.reverse();
		let converters = ConverterRegistry::new();
		let mut cursor = RecordCursor::new(&rows, &reversed, &converters);

		assert_eq!(cursor.columns(), &["age".to_string(), "name".into(), "id".into()]);
		cursor.advance();
		assert_eq!(cursor.int32(0).unwrap(), Some(3));
		assert_eq!(cursor.int64(2).unwrap(), Some(7));
	}

	#[test]
	fn converter_applies_per_cell() {
		let rows = vec![Row {
			id: 1,
			name: "plain".into(),
			age: None,
		}];
		let converters = ConverterRegistry::new();
		converters.register(ValueKind::Text, |v| Ok(Value::Text(v.to_text().to_uppercase())));

		let mut cursor = RecordCursor::new(&rows, &mapping(), &converters);
		cursor.advance();
		assert_eq!(cursor.string(1).unwrap(), Some("PLAIN".into()));
		// Non-text cells are untouched
		assert_eq!(cursor.int64(0).unwrap(), Some(1));
	}

	#[test]
	fn out_of_range_cell_is_null() {
		let rows = vec![Row {
			id: 1,
			name: "a".into(),
			age: None,
		}];
		let converters = ConverterRegistry::new();
		let mut cursor = RecordCursor::new(&rows, &mapping(), &converters);
		cursor.advance();
		assert!(cursor.is_null(9));
		assert_eq!(cursor.value(9).unwrap(), Value::Null);
	}
}
