// Copyright (c) bulkmerge.dev 2026
// This file is licensed under the MIT, see license.md file

//! Text-format COPY encoding.
//!
//! One line per row, tab-separated cells, `\N` for NULL, with the four
//! characters COPY treats specially escaped. The server parses each cell
//! with the destination column's input conversion, so cells carry the plain
//! text rendering of each value.

use bulkmerge_core::{Result, RowSource, Value};

pub(crate) fn encode_row(buffer: &mut String, rows: &dyn RowSource, width: usize) -> Result<()> {
	for index in 0..width {
		if index > 0 {
			buffer.push('\t');
		}
		match rows.value(index)? {
			Value::Null => buffer.push_str("\\N"),
			Value::Bool(b) => buffer.push(if b { 't' } else { 'f' }),
			value => escape_into(buffer, &value.to_text()),
		}
	}
	buffer.push('\n');
	Ok(())
}

fn escape_into(buffer: &mut String, text: &str) {
	for ch in text.chars() {
		match ch {
			'\\' => buffer.push_str("\\\\"),
			'\t' => buffer.push_str("\\t"),
			'\n' => buffer.push_str("\\n"),
			'\r' => buffer.push_str("\\r"),
			ch => buffer.push(ch),
		}
	}
}

#[cfg(test)]
mod tests {
	use bulkmerge_core::{ConverterRegistry, FieldDef, IntoValue, Record, RecordCursor, Value, ValueKind};

	use super::*;

	struct Cell {
		text: Option<String>,
		flag: bool,
		blob: Vec<u8>,
	}

	const CELL_FIELDS: &[FieldDef] = &[
		FieldDef {
			name: "text",
			column: "text",
			kind: ValueKind::Text,
			key: false,
		},
		FieldDef {
			name: "flag",
			column: "flag",
			kind: ValueKind::Bool,
			key: false,
		},
		FieldDef {
			name: "blob",
			column: "blob",
			kind: ValueKind::Bytes,
			key: false,
		},
	];

	impl Record for Cell {
		fn table() -> &'static str {
			"Cell"
		}

		fn fields() -> &'static [FieldDef] {
			CELL_FIELDS
		}

		fn get(&self, field: &str) -> Value {
			match field {
				"text" => self.text.clone().into_value(),
				"flag" => self.flag.into_value(),
				"blob" => self.blob.clone().into_value(),
				_ => Value::Null,
			}
		}

		fn set(&mut self, _field: &str, _value: Value) {}
	}

	fn encode(records: &[Cell]) -> String {
		let converters = ConverterRegistry::new();
		let mapping: Vec<(String, &'static FieldDef)> =
			CELL_FIELDS.iter().map(|f| (f.column.to_string(), f)).collect();
		let mut cursor = RecordCursor::new(records, &mapping, &converters);
		let mut out = String::new();
		while cursor.advance() {
			encode_row(&mut out, &cursor, 3).unwrap();
		}
		out
	}

	#[test]
	fn null_renders_as_backslash_n() {
		let out = encode(&[Cell {
			text: None,
			flag: true,
			blob: vec![],
		}]);
		assert_eq!(out, "\\N\tt\t\\\\x\n");
	}

	#[test]
	fn special_characters_are_escaped() {
		let out = encode(&[Cell {
			text: Some("a\tb\nc\\d".into()),
			flag: false,
			blob: vec![0xde, 0xad],
		}]);
		assert_eq!(out, "a\\tb\\nc\\\\d\tf\t\\\\xdead\n");
	}

	#[test]
	fn rows_are_newline_separated() {
		let records = vec![
			Cell {
				text: Some("a".into()),
				flag: true,
				blob: vec![1],
			},
			Cell {
				text: Some("b".into()),
				flag: false,
				blob: vec![2],
			},
		];
		let out = encode(&records);
		assert_eq!(out, "a\tt\t\\\\x01\nb\tf\t\\\\x02\n");
	}
}
